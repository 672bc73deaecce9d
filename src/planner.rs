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

//! Decides which resolved bindings get a memoized provider slot in the
//! generated implementation class.

use crate::bindings::{
    Binding, GraphDependencyBinding, MembersInjectedBinding, MultibindingBinding, ProvidedBinding,
};
use crate::graph::BindingGraph;
use crate::keys::TypeKey;
use std::collections::{BTreeMap, BTreeSet};

/// Computes the provider-field set for a validated graph.
///
/// `reference_counts` comes from the validator's root traversal;
/// `externally_used` carries keys child graphs reach through this graph.
pub fn plan_provider_fields(
    graph: &BindingGraph<'_>,
    reference_counts: &BTreeMap<TypeKey, usize>,
    deferred_types: &[TypeKey],
    externally_used: &BTreeSet<TypeKey>,
) -> Vec<TypeKey> {
    let node = graph.node().clone();
    let mut fields = BTreeSet::new();

    for (key, binding) in graph.bindings_snapshot() {
        if graph.is_twin_key(&key) {
            continue;
        }
        // Multibindings assemble ad hoc at each use site.
        if binding.as_any().downcast_ref::<MultibindingBinding>().is_some() {
            continue;
        }
        if binding.scope().is_some() {
            fields.insert(key.clone());
            continue;
        }
        if binding
            .as_any()
            .downcast_ref::<GraphDependencyBinding>()
            .is_some()
        {
            fields.insert(key.clone());
            continue;
        }
        if let Some(members) = binding.as_any().downcast_ref::<MembersInjectedBinding>() {
            // Wrapper-requested injections are backed by a separately
            // generated injector; graph injector functions are inlined and
            // memoized here.
            if members.is_from_injector_function {
                fields.insert(key.clone());
            }
            continue;
        }
        if binding.is_into_multibinding() {
            // Collected at the multibinding's assembly site instead.
            continue;
        }
        let references = reference_counts.get(&key).copied().unwrap_or(0);
        if references >= 2 {
            fields.insert(key.clone());
            continue;
        }
        // A deferred vertex is reached through a provider instance, which
        // needs a slot to hand out.
        if deferred_types.contains(&key) {
            fields.insert(key.clone());
            continue;
        }
        if externally_used.contains(&key) {
            fields.insert(key.clone());
        }
    }

    // Extendable graphs keep every scoped provider reachable for
    // descendants, used locally or not.
    if node.is_extendable {
        for (key, binding) in graph.bindings_snapshot() {
            if graph.is_twin_key(&key) {
                continue;
            }
            if binding.scope().is_some()
                && binding.as_any().downcast_ref::<ProvidedBinding>().is_some()
            {
                fields.insert(key);
            }
        }
    }

    fields.into_iter().collect()
}
