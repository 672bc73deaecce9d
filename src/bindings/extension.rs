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
use crate::type_data::ClassId;
use std::any::Any;

/// Instantiation of a nested child graph. The child is resolved as its own
/// unit against this graph pushed as a parent level; the binding itself has
/// no graph dependencies.
#[derive(Debug)]
pub struct GraphExtensionBinding {
    pub contextual_key: ContextualTypeKey,
    pub extension_class: ClassId,
    /// The graph the extension extends.
    pub parent_key: TypeKey,
    pub location: Option<Location>,
}

impl Binding for GraphExtensionBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!("{} (graph extension)", self.extension_class.dotted())
    }

    fn dependencies(&self) -> Vec<ContextualTypeKey> {
        Vec::new()
    }

    fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A factory interface whose single abstract function builds a graph
/// extension, forwarding creator parameters.
#[derive(Debug)]
pub struct GraphExtensionFactoryBinding {
    pub contextual_key: ContextualTypeKey,
    pub factory_class: ClassId,
    /// Key of the extension the factory builds.
    pub extension_key: TypeKey,
    pub parent_key: TypeKey,
    pub location: Option<Location>,
}

impl Binding for GraphExtensionFactoryBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!("{} (graph extension factory)", self.factory_class.dotted())
    }

    fn dependencies(&self) -> Vec<ContextualTypeKey> {
        Vec::new()
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
