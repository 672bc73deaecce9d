/*
Copyright 2021 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::bindings::Binding;
use crate::declarations::FunctionDecl;
use crate::diagnostics::Location;
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::parameters::Parameters;
use crate::type_data::ClassId;
use std::any::Any;

/// A factory interface over an assisted-injected class. The generated
/// factory forwards assisted parameters and pulls the rest from the graph,
/// so the whole node is deferrable for cycle breaking.
#[derive(Debug)]
pub struct AssistedFactoryBinding {
    pub contextual_key: ContextualTypeKey,
    pub class_id: ClassId,
    /// The assisted-injected class this factory creates; resolved lazily as
    /// an ordinary graph request.
    pub target: ContextualTypeKey,
    /// The factory's single abstract function.
    pub function: FunctionDecl,
    pub parameters: Parameters,
    pub location: Option<Location>,
}

impl Binding for AssistedFactoryBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!("{} (assisted factory)", self.class_id.dotted())
    }

    fn parameters(&self) -> Option<&Parameters> {
        Some(&self.parameters)
    }

    fn dependencies(&self) -> Vec<ContextualTypeKey> {
        vec![self.target.clone()]
    }

    fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn is_implicitly_deferrable(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
