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
use crate::diagnostics::Location;
use crate::graph_node::ProviderFactory;
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::parameters::Parameters;
use std::any::Any;

/// Result of a provider function declared on the graph, a companion, or an
/// included binding container.
#[derive(Debug)]
pub struct ProvidedBinding {
    pub contextual_key: ContextualTypeKey,
    pub provider_factory: ProviderFactory,
    pub parameters: Parameters,
    pub scope: Option<AnnotationData>,
    pub annotations: Vec<AnnotationData>,
    /// Set when the provider also declares an explicit bound supertype.
    pub aliased_type: Option<ContextualTypeKey>,
    /// Contribution markers.
    pub into_set: bool,
    pub elements_into_set: bool,
    pub into_map: bool,
    pub map_key: Option<AnnotationData>,
    pub location: Option<Location>,
}

impl ProvidedBinding {
    pub fn is_multibinding_contribution(&self) -> bool {
        self.into_set || self.elements_into_set || self.into_map
    }
}

impl Binding for ProvidedBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!(
            "{}.{} (provides)",
            self.provider_factory.owner.dotted(),
            self.provider_factory.function.name
        )
    }

    fn scope(&self) -> Option<&AnnotationData> {
        self.scope.as_ref()
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

    fn is_into_multibinding(&self) -> bool {
        self.is_multibinding_contribution()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
