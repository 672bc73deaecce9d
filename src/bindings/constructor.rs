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

use crate::annotation::AnnotationData;
use crate::bindings::Binding;
use crate::declarations::FunctionDecl;
use crate::diagnostics::Location;
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::parameters::Parameters;
use crate::type_data::ClassId;
use std::any::Any;

/// A class constructed by the graph through its injectable constructor.
#[derive(Debug)]
pub struct ConstructorInjectedBinding {
    pub contextual_key: ContextualTypeKey,
    pub class_id: ClassId,
    pub constructor: FunctionDecl,
    pub parameters: Parameters,
    pub scope: Option<AnnotationData>,
    pub annotations: Vec<AnnotationData>,
    /// Members the generated factory injects after construction; their
    /// requests are part of this binding's dependencies.
    pub injected_members: Vec<ContextualTypeKey>,
    /// Construction goes through an assisted factory.
    pub is_assisted: bool,
    pub location: Option<Location>,
}

impl Binding for ConstructorInjectedBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!("{} (constructor injected)", self.class_id.dotted())
    }

    fn scope(&self) -> Option<&AnnotationData> {
        self.scope.as_ref()
    }

    fn parameters(&self) -> Option<&Parameters> {
        Some(&self.parameters)
    }

    fn dependencies(&self) -> Vec<ContextualTypeKey> {
        let mut result = self.parameters.graph_dependencies();
        result.extend(self.injected_members.iter().cloned());
        result
    }

    fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
