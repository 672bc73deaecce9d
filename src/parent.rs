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

//! Overlay for bindings inherited from extended parent graphs.
//!
//! One level per extended parent, pushed while a child graph resolves.
//! Introduction levels per key only ever grow and only the topmost level is
//! removable, so `pop` exactly reverses `push`.

use crate::annotation::AnnotationData;
use crate::keys::TypeKey;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug)]
struct ParentLevel {
    node_key: TypeKey,
    scopes: BTreeSet<AnnotationData>,
    delta_provided: BTreeSet<TypeKey>,
    used: BTreeSet<TypeKey>,
}

#[derive(Debug, Default)]
pub struct ParentContext {
    levels: Vec<ParentLevel>,
    available: BTreeSet<TypeKey>,
    /// Per key, the levels that introduced it, deepest last.
    key_intro_stack: BTreeMap<TypeKey, Vec<usize>>,
    parent_scopes: BTreeSet<AnnotationData>,
    /// Keys staged for the next `push_parent_graph`.
    pending: BTreeSet<TypeKey>,
}

impl ParentContext {
    pub fn new() -> Self {
        Default::default()
    }

    /// Stages `key` to be introduced by the next pushed level.
    pub fn add(&mut self, key: TypeKey) {
        self.pending.insert(key);
    }

    pub fn add_all<I: IntoIterator<Item = TypeKey>>(&mut self, keys: I) {
        self.pending.extend(keys);
    }

    pub fn push_parent_graph(
        &mut self,
        node_key: TypeKey,
        scopes: BTreeSet<AnnotationData>,
    ) {
        let level_index = self.levels.len();
        let delta: BTreeSet<TypeKey> = std::mem::take(&mut self.pending);
        for key in &delta {
            self.available.insert(key.clone());
            self.key_intro_stack
                .entry(key.clone())
                .or_default()
                .push(level_index);
        }
        self.parent_scopes.extend(scopes.iter().cloned());
        self.levels.push(ParentLevel {
            node_key,
            scopes,
            delta_provided: delta,
            used: BTreeSet::new(),
        });
    }

    pub fn pop_parent_graph(&mut self) {
        let level = match self.levels.pop() {
            Some(level) => level,
            None => return,
        };
        let level_index = self.levels.len();
        for key in &level.delta_provided {
            if let Some(stack) = self.key_intro_stack.get_mut(key) {
                if stack.last() == Some(&level_index) {
                    stack.pop();
                }
                if stack.is_empty() {
                    self.key_intro_stack.remove(key);
                }
            }
        }
        self.available = self.key_intro_stack.keys().cloned().collect();
        self.parent_scopes = self
            .levels
            .iter()
            .flat_map(|level| level.scopes.iter().cloned())
            .collect();
    }

    /// Records a child's use of `key` and returns the owning graph's key.
    ///
    /// The deepest level introducing the key is the owner; every level
    /// between it and the child must plumb the value through, so they are
    /// all marked used. A key that was never introduced but whose scope is
    /// held by some level is introduced retroactively at that level.
    pub fn mark(&mut self, key: &TypeKey, scope: Option<&AnnotationData>) -> Option<TypeKey> {
        let intro_level = match self.key_intro_stack.get(key).and_then(|s| s.last()) {
            Some(level) => *level,
            None => {
                let scope = scope?;
                let retro_level = self
                    .levels
                    .iter()
                    .position(|level| level.scopes.contains(scope))?;
                self.available.insert(key.clone());
                self.key_intro_stack
                    .entry(key.clone())
                    .or_default()
                    .push(retro_level);
                self.levels[retro_level].delta_provided.insert(key.clone());
                retro_level
            }
        };
        for level in &mut self.levels[intro_level..] {
            level.used.insert(key.clone());
        }
        Some(self.levels[intro_level].node_key.clone())
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.available.contains(key)
    }

    pub fn contains_scope(&self, scope: &AnnotationData) -> bool {
        self.parent_scopes.contains(scope)
    }

    pub fn current_parent_graph(&self) -> Option<&TypeKey> {
        self.levels.last().map(|level| &level.node_key)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn available_keys(&self) -> &BTreeSet<TypeKey> {
        &self.available
    }

    /// Keys the current deepest level must keep reachable for its children.
    pub fn used_keys(&self) -> BTreeSet<TypeKey> {
        self.levels
            .last()
            .map(|level| level.used.clone())
            .unwrap_or_default()
    }
}
