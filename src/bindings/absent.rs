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
use crate::keys::{ContextualTypeKey, TypeKey};
use std::any::Any;

/// A defaulted parameter with no available binding: the call site keeps the
/// default. Never stored in a graph.
#[derive(Debug)]
pub struct AbsentBinding {
    pub contextual_key: ContextualTypeKey,
}

impl Binding for AbsentBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!("{} (absent, defaulted)", self.contextual_key.render(true))
    }

    fn dependencies(&self) -> Vec<ContextualTypeKey> {
        Vec::new()
    }

    fn is_absent(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
