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
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::type_data::ClassId;
use once_cell::unsync::OnceCell;
use std::any::Any;

/// A binds-style mapping from one key to another. Always unscoped; the
/// underlying binding is chased on first use and memoized.
#[derive(Debug)]
pub struct AliasBinding {
    pub contextual_key: ContextualTypeKey,
    /// The key this alias forwards to.
    pub aliased: ContextualTypeKey,
    /// Declaring class and callable, for naming only.
    pub owner: ClassId,
    pub callable_name: String,
    pub into_set: bool,
    pub elements_into_set: bool,
    pub into_map: bool,
    pub map_key: Option<AnnotationData>,
    pub location: Option<Location>,
    resolved: OnceCell<TypeKey>,
}

impl AliasBinding {
    pub fn new(
        contextual_key: ContextualTypeKey,
        aliased: ContextualTypeKey,
        owner: ClassId,
        callable_name: String,
    ) -> Self {
        AliasBinding {
            contextual_key,
            aliased,
            owner,
            callable_name,
            into_set: false,
            elements_into_set: false,
            into_map: false,
            map_key: None,
            location: None,
            resolved: OnceCell::new(),
        }
    }

    /// Records the terminal key the containing graph resolved this alias to.
    pub fn memoize_resolution(&self, terminal: TypeKey) {
        let _ = self.resolved.set(terminal);
    }

    pub fn resolved(&self) -> Option<&TypeKey> {
        self.resolved.get()
    }

    pub fn is_multibinding_contribution(&self) -> bool {
        self.into_set || self.elements_into_set || self.into_map
    }
}

impl Binding for AliasBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!("{}.{} (binds)", self.owner.dotted(), self.callable_name)
    }

    fn dependencies(&self) -> Vec<ContextualTypeKey> {
        vec![self.aliased.clone()]
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
