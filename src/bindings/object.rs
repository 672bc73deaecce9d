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
use std::any::Any;

/// A language-level singleton object; referenced directly, never
/// constructed.
#[derive(Debug)]
pub struct ObjectClassBinding {
    pub contextual_key: ContextualTypeKey,
    pub class_id: ClassId,
    pub annotations: Vec<AnnotationData>,
    pub location: Option<Location>,
}

impl Binding for ObjectClassBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!("{} (object)", self.class_id.dotted())
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
