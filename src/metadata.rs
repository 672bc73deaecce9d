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

//! Metadata attached to a generated graph class so downstream compilations
//! can rehydrate the graph without re-parsing it.

use serde::{Deserialize, Serialize};

/// Identifier the payload is filed under in the emitted class's
/// type-metadata extension slot.
pub const METADATA_PLUGIN_ID: &str = "dev.lattice.graph-metadata";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraphMetadata {
    pub is_graph: bool,
    pub provider_factory_classes: Vec<String>,
    pub accessor_callable_names: Vec<String>,
    /// Bit `i` set iff the `i`-th accessor in sorted order returns a
    /// multibinding.
    pub multibinding_accessor_indices: i64,
    pub included_binding_containers: Vec<String>,
}

impl GraphMetadata {
    /// Sorted, deduplicated form; the only shape ever persisted.
    pub fn normalized(mut self) -> Self {
        self.provider_factory_classes.sort();
        self.provider_factory_classes.dedup();
        self.accessor_callable_names.sort();
        self.accessor_callable_names.dedup();
        self.included_binding_containers.sort();
        self.included_binding_containers.dedup();
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<GraphMetadata> {
        serde_json::from_str::<GraphMetadata>(payload).map(GraphMetadata::normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_field_wise_equal() {
        let metadata = GraphMetadata {
            is_graph: true,
            provider_factory_classes: vec![
                "com.example.NetworkProviders".to_owned(),
                "com.example.DbProviders".to_owned(),
            ],
            accessor_callable_names: vec!["message".to_owned(), "db".to_owned()],
            multibinding_accessor_indices: 0b10,
            included_binding_containers: vec!["com.example.Container".to_owned()],
        }
        .normalized();
        let json = metadata.to_json().unwrap();
        let back = GraphMetadata::from_json(&json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn normalized_sorts_unordered_input() {
        let metadata = GraphMetadata {
            is_graph: true,
            provider_factory_classes: vec!["b".to_owned(), "a".to_owned(), "b".to_owned()],
            ..Default::default()
        }
        .normalized();
        assert_eq!(
            metadata.provider_factory_classes,
            vec!["a".to_owned(), "b".to_owned()]
        );
    }
}
