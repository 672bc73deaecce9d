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
use crate::diagnostics::Location;
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::parameters::Parameters;
use crate::type_data::ClassId;
use std::any::Any;

/// Post-construction injection of a target class's members, either behind a
/// members-injector wrapper request or an injector function on the graph.
#[derive(Debug)]
pub struct MembersInjectedBinding {
    pub contextual_key: ContextualTypeKey,
    /// One parameter per injectable member, in declaration order.
    pub parameters: Parameters,
    /// Name of the injector function when declared on the graph.
    pub function_name: String,
    pub is_from_injector_function: bool,
    pub target_class: ClassId,
    pub location: Option<Location>,
}

impl Binding for MembersInjectedBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!("{} (members injected)", self.target_class.dotted())
    }

    fn parameters(&self) -> Option<&Parameters> {
        Some(&self.parameters)
    }

    fn dependencies(&self) -> Vec<ContextualTypeKey> {
        self.parameters.graph_dependencies()
    }

    fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
