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

//! Deterministic topological ordering with cycle breaking.
//!
//! Edges point from a binding to its prerequisites. Cycles are only legal
//! when they can be broken on a deferrable edge (a provider or lazy
//! request) or a whole-node-deferrable vertex; the broken vertices are
//! reported so the emitter gives them provider-instance indirection.

use crate::diagnostics::FatalDiagnostic;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::fmt::Debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoSortResult<V> {
    pub sorted_keys: Vec<V>,
    pub deferred_types: Vec<V>,
}

pub fn topo_sort<V, F>(
    adjacency: &BTreeMap<V, BTreeSet<V>>,
    deferrable: &BTreeMap<V, BTreeSet<V>>,
    implicitly_deferrable: &BTreeSet<V>,
    on_cycle: F,
) -> Result<TopoSortResult<V>, FatalDiagnostic>
where
    V: Ord + Clone + Debug,
    F: Fn(&[V]) -> FatalDiagnostic,
{
    // Dense ids in key order keep every later tie-break deterministic.
    let mut vertices: BTreeSet<V> = adjacency.keys().cloned().collect();
    for targets in adjacency.values() {
        vertices.extend(targets.iter().cloned());
    }
    let vertices: Vec<V> = vertices.into_iter().collect();
    let id_of: BTreeMap<&V, usize> = vertices.iter().enumerate().map(|(i, v)| (v, i)).collect();
    let edges: Vec<Vec<usize>> = vertices
        .iter()
        .map(|v| {
            adjacency
                .get(v)
                .map(|targets| targets.iter().filter_map(|t| id_of.get(t).copied()).collect())
                .unwrap_or_default()
        })
        .collect();

    let components = tarjan_scc(&edges);
    let component_of: Vec<usize> = {
        let mut result = vec![0usize; vertices.len()];
        for (component_id, members) in components.iter().enumerate() {
            for &member in members {
                result[member] = component_id;
            }
        }
        result
    };

    // An edge is cuttable when the request itself is deferrable or either
    // endpoint is a whole-node-deferrable binding.
    let cuttable = |from: usize, to: usize| -> bool {
        if implicitly_deferrable.contains(&vertices[from])
            || implicitly_deferrable.contains(&vertices[to])
        {
            return true;
        }
        deferrable
            .get(&vertices[from])
            .map(|targets| targets.contains(&vertices[to]))
            .unwrap_or(false)
    };

    let implicit_ids: BTreeSet<usize> = vertices
        .iter()
        .enumerate()
        .filter(|(_, v)| implicitly_deferrable.contains(v))
        .map(|(id, _)| id)
        .collect();

    let mut deferred = BTreeSet::<usize>::new();
    for members in &components {
        let has_self_loop = members.len() == 1 && edges[members[0]].contains(&members[0]);
        if members.len() == 1 && !has_self_loop {
            continue;
        }
        let chosen = classify_cycle(members, &edges, &cuttable, &implicit_ids);
        match chosen {
            Some(set) => deferred.extend(set),
            None => {
                let mut cycle: Vec<V> = members.iter().map(|&m| vertices[m].clone()).collect();
                cycle.sort();
                return Err(on_cycle(&cycle));
            }
        }
    }

    // Component DAG with reversed edges: prerequisite component first.
    let component_count = components.len();
    let mut dag_edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); component_count];
    let mut indegree = vec![0usize; component_count];
    for (from, targets) in edges.iter().enumerate() {
        for &to in targets {
            let from_component = component_of[from];
            let to_component = component_of[to];
            if from_component == to_component {
                continue;
            }
            if dag_edges[to_component].insert(from_component) {
                indegree[from_component] += 1;
            }
        }
    }

    // Kahn with a minimum-first queue over component ids.
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(component, _)| Reverse(component))
        .collect();
    let mut sorted_keys = Vec::with_capacity(vertices.len());
    let mut emitted = 0usize;
    while let Some(Reverse(component)) = ready.pop() {
        emitted += 1;
        let mut members: Vec<usize> = components[component].clone();
        members.sort();
        for member in members {
            sorted_keys.push(vertices[member].clone());
        }
        for &dependent in &dag_edges[component] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }
    debug_assert_eq!(emitted, component_count);

    Ok(TopoSortResult {
        sorted_keys,
        deferred_types: deferred.into_iter().map(|id| vertices[id].clone()).collect(),
    })
}

/// Smallest deferral set for one strongly connected component, or `None`
/// when no cuttable edge can break it.
///
/// Single-vertex deferral is preferred, searched in order: whole-node
/// deferrable members first, then members with an outgoing cuttable edge,
/// then members touching any cuttable edge; all in key order. When no
/// single vertex suffices the same candidate order is accumulated greedily.
fn classify_cycle<C>(
    members: &[usize],
    edges: &[Vec<usize>],
    cuttable: &C,
    implicit: &BTreeSet<usize>,
) -> Option<BTreeSet<usize>>
where
    C: Fn(usize, usize) -> bool,
{
    let member_set: BTreeSet<usize> = members.iter().copied().collect();
    let internal_edges: Vec<(usize, usize)> = members
        .iter()
        .flat_map(|&from| {
            edges[from]
                .iter()
                .filter(|to| member_set.contains(to))
                .map(move |&to| (from, to))
        })
        .collect();

    let outgoing_cuttable: BTreeSet<usize> = internal_edges
        .iter()
        .filter(|&&(from, to)| cuttable(from, to))
        .map(|&(from, _)| from)
        .collect();
    let any_cuttable: BTreeSet<usize> = internal_edges
        .iter()
        .filter(|&&(from, to)| cuttable(from, to))
        .flat_map(|&(from, to)| [from, to])
        .collect();
    if any_cuttable.is_empty() {
        return None;
    }

    let mut candidates: Vec<usize> = Vec::new();
    for &candidate in member_set.iter().filter(|member| implicit.contains(member)) {
        candidates.push(candidate);
    }
    for &candidate in &outgoing_cuttable {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    for &candidate in &any_cuttable {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    let acyclic_without = |chosen: &BTreeSet<usize>| -> bool {
        is_acyclic(&member_set, &internal_edges, |from, to| {
            (chosen.contains(&from) || chosen.contains(&to)) && cuttable(from, to)
        })
    };

    for &candidate in &candidates {
        let single: BTreeSet<usize> = [candidate].into_iter().collect();
        if acyclic_without(&single) {
            return Some(single);
        }
    }

    let mut accumulated = BTreeSet::new();
    for &candidate in &candidates {
        accumulated.insert(candidate);
        if acyclic_without(&accumulated) {
            return Some(accumulated);
        }
    }
    None
}

/// Kahn count on the induced subgraph, skipping edges `cut` removes.
fn is_acyclic<C>(members: &BTreeSet<usize>, internal_edges: &[(usize, usize)], cut: C) -> bool
where
    C: Fn(usize, usize) -> bool,
{
    let mut indegree: BTreeMap<usize, usize> = members.iter().map(|&m| (m, 0)).collect();
    let kept: Vec<(usize, usize)> = internal_edges
        .iter()
        .copied()
        .filter(|&(from, to)| !cut(from, to))
        .collect();
    for &(_, to) in &kept {
        *indegree.get_mut(&to).unwrap() += 1;
    }
    let mut ready: Vec<usize> = indegree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&member, _)| member)
        .collect();
    let mut removed = 0usize;
    while let Some(member) = ready.pop() {
        removed += 1;
        for &(from, to) in &kept {
            if from == member {
                let degree = indegree.get_mut(&to).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    ready.push(to);
                }
            }
        }
    }
    removed == members.len()
}

/// Iterative Tarjan; recursion on user-sized graphs overflows the stack.
fn tarjan_scc(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = edges.len();
    let mut index_counter = 0usize;
    let mut indices: Vec<Option<usize>> = vec![None; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();

    // (vertex, next child position)
    let mut work: Vec<(usize, usize)> = Vec::new();
    for root in 0..n {
        if indices[root].is_some() {
            continue;
        }
        work.push((root, 0));
        while let Some(&(v, mut child_pos)) = work.last() {
            if child_pos == 0 {
                indices[v] = Some(index_counter);
                lowlink[v] = index_counter;
                index_counter += 1;
                stack.push(v);
                on_stack[v] = true;
            }
            let mut recursed = false;
            while child_pos < edges[v].len() {
                let child = edges[v][child_pos];
                child_pos += 1;
                match indices[child] {
                    None => {
                        recursed = true;
                        break;
                    }
                    Some(child_index) => {
                        if on_stack[child] {
                            lowlink[v] = lowlink[v].min(child_index);
                        }
                    }
                }
            }
            work.last_mut().unwrap().1 = child_pos;
            if recursed {
                work.push((edges[v][child_pos - 1], 0));
                continue;
            }
            work.pop();
            if let Some(&(parent, _)) = work.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if lowlink[v] == indices[v].unwrap() {
                let mut component = Vec::new();
                loop {
                    let member = stack.pop().unwrap();
                    on_stack[member] = false;
                    component.push(member);
                    if member == v {
                        break;
                    }
                }
                component.sort();
                components.push(component);
            }
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Diagnostic, DiagnosticCode};

    fn graph(edges: &[(&str, &str)]) -> BTreeMap<String, BTreeSet<String>> {
        let mut result: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (from, to) in edges {
            result
                .entry((*from).to_owned())
                .or_default()
                .insert((*to).to_owned());
            result.entry((*to).to_owned()).or_default();
        }
        result
    }

    fn cycle_error(members: &[String]) -> FatalDiagnostic {
        FatalDiagnostic(Diagnostic::new(
            DiagnosticCode::DependencyCycle,
            format!("cycle: {:?}", members),
        ))
    }

    fn position(sorted: &[String], name: &str) -> usize {
        sorted.iter().position(|v| v == name).unwrap()
    }

    #[test]
    fn chain_sorts_prerequisites_first() {
        let adjacency = graph(&[("a", "b"), ("b", "c")]);
        let result = topo_sort(&adjacency, &BTreeMap::new(), &BTreeSet::new(), cycle_error)
            .unwrap();
        assert!(position(&result.sorted_keys, "c") < position(&result.sorted_keys, "b"));
        assert!(position(&result.sorted_keys, "b") < position(&result.sorted_keys, "a"));
        assert!(result.deferred_types.is_empty());
    }

    #[test]
    fn hard_cycle_reports_members() {
        let adjacency = graph(&[("a", "b"), ("b", "a")]);
        let error = topo_sort(&adjacency, &BTreeMap::new(), &BTreeSet::new(), cycle_error)
            .unwrap_err();
        assert!(error.0.message.contains("\"a\""));
        assert!(error.0.message.contains("\"b\""));
    }

    #[test]
    fn deferrable_edge_breaks_cycle() {
        let adjacency = graph(&[("a", "b"), ("b", "a")]);
        let deferrable = graph(&[("a", "b")]);
        let result = topo_sort(&adjacency, &deferrable, &BTreeSet::new(), cycle_error).unwrap();
        assert_eq!(result.sorted_keys.len(), 2);
        assert_eq!(result.deferred_types.len(), 1);
    }

    #[test]
    fn implicitly_deferrable_vertex_preferred() {
        // a -> b -> a strictly, but b is whole-node deferrable.
        let adjacency = graph(&[("a", "b"), ("b", "a")]);
        let implicit: BTreeSet<String> = ["b".to_owned()].into_iter().collect();
        let result = topo_sort(&adjacency, &BTreeMap::new(), &implicit, cycle_error).unwrap();
        assert_eq!(result.deferred_types, vec!["b".to_owned()]);
    }

    #[test]
    fn self_loop_needs_deferrable_edge() {
        let adjacency = graph(&[("a", "a")]);
        assert!(topo_sort(&adjacency, &BTreeMap::new(), &BTreeSet::new(), cycle_error).is_err());
        let deferrable = graph(&[("a", "a")]);
        let result = topo_sort(&adjacency, &deferrable, &BTreeSet::new(), cycle_error).unwrap();
        assert_eq!(result.deferred_types, vec!["a".to_owned()]);
    }

    #[test]
    fn deterministic_across_runs() {
        let adjacency = graph(&[("d", "a"), ("c", "a"), ("b", "a"), ("e", "c")]);
        let first = topo_sort(&adjacency, &BTreeMap::new(), &BTreeSet::new(), cycle_error)
            .unwrap();
        for _ in 0..8 {
            let again = topo_sort(&adjacency, &BTreeMap::new(), &BTreeSet::new(), cycle_error)
                .unwrap();
            assert_eq!(again, first);
        }
        // Prerequisite-first and ties resolved by key order.
        assert_eq!(first.sorted_keys[0], "a");
    }

    #[test]
    fn two_cycles_each_get_a_deferral() {
        let adjacency = graph(&[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c"), ("b", "c")]);
        let deferrable = graph(&[("a", "b"), ("c", "d")]);
        let result = topo_sort(&adjacency, &deferrable, &BTreeSet::new(), cycle_error).unwrap();
        assert_eq!(result.deferred_types.len(), 2);
        assert_eq!(result.sorted_keys.len(), 4);
    }
}
