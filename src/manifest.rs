/*
Copyright 2020 Google LLC

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

//! Serialized declaration payload exchanged with the frontend.
//!
//! Each compilation emits one manifest; a compilation consuming others
//! merges their manifests before building the [`DeclarationIndex`] the
//! resolver works against.

use crate::declarations::{ClassDecl, DeclarationIndex};
use crate::type_data::ClassId;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A contribution surfaced by a generated hint declaration: `contribution`
/// contributes to `scope`, discoverable without a classpath scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScopeHint {
    pub scope: ClassId,
    pub contribution: ClassId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeclarationManifest {
    pub module_name: String,
    pub classes: Vec<ClassDecl>,
    pub scope_hints: Vec<ScopeHint>,
}

impl DeclarationManifest {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn merge_from(&mut self, other: &DeclarationManifest) {
        self.classes.extend_from_slice(other.classes.as_slice());
        self.scope_hints
            .extend_from_slice(other.scope_hints.as_slice());
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).with_context(|| {
            format!("cannot serialize declaration manifest for {}", self.module_name)
        })
    }

    pub fn from_json(payload: &str) -> anyhow::Result<DeclarationManifest> {
        serde_json::from_str(payload).with_context(|| "cannot parse declaration manifest")
    }
}

/// Builds the resolver's index from the current compilation's manifest and
/// the manifests of its dependencies. Later entries never shadow earlier
/// ones for the same class id.
pub fn build_index(
    current: &DeclarationManifest,
    dependencies: &[DeclarationManifest],
) -> DeclarationIndex {
    let mut index = DeclarationIndex::new();
    index.set_current_module(current.module_name.clone());
    for manifest in std::iter::once(current).chain(dependencies) {
        for class in &manifest.classes {
            if index.class(&class.class_id).is_none() {
                index.add_class(class.clone());
            }
        }
        for hint in &manifest.scope_hints {
            index.add_scope_hint(hint.scope.clone(), hint.contribution.clone());
        }
    }
    index
}
