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

//! Validation of a seeded binding graph: cycle detection with deferrable
//! breaking, missing-binding sweep, scope compatibility, and the final
//! deterministic ordering.

use crate::bindings::{AliasBinding, Binding, MultibindingBinding};
use crate::diagnostics::{fail_at, DiagnosticCode, FatalDiagnostic};
use crate::graph::BindingGraph;
use crate::graph_node::DependencyGraphNode;
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::resolver::ResolverContext;
use crate::sort::{topo_sort, TopoSortResult};
use crate::stack::{BindingStack, BindingStackEntry};
use crate::type_data::ClassId;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ValidatedGraph {
    pub sorted_keys: Vec<TypeKey>,
    pub deferred_types: Vec<TypeKey>,
    /// Reference counts per key, seeded from the root traversal; input to
    /// the provider-field planner.
    pub reference_counts: BTreeMap<TypeKey, usize>,
}

pub struct Validator<'a, 'ctx> {
    ctx: &'a ResolverContext<'ctx>,
    registry: &'a BTreeMap<ClassId, Rc<DependencyGraphNode>>,
    deferred: BTreeSet<TypeKey>,
    reference_counts: BTreeMap<TypeKey, usize>,
    expanded: BTreeSet<TypeKey>,
}

impl<'a, 'ctx> Validator<'a, 'ctx> {
    pub fn new(
        ctx: &'a ResolverContext<'ctx>,
        registry: &'a BTreeMap<ClassId, Rc<DependencyGraphNode>>,
    ) -> Self {
        Validator {
            ctx,
            registry,
            deferred: BTreeSet::new(),
            reference_counts: BTreeMap::new(),
            expanded: BTreeSet::new(),
        }
    }

    pub fn validate(
        mut self,
        graph: &mut BindingGraph<'ctx>,
        stack: &mut BindingStack,
    ) -> Result<ValidatedGraph, FatalDiagnostic> {
        let node = graph.node().clone();

        // Roots: every accessor and injector the graph exposes.
        let mut path: Vec<PathEdge> = Vec::new();
        for accessor in &node.accessors {
            *self
                .reference_counts
                .entry(accessor.contextual_key.type_key().clone())
                .or_default() += 1;
            stack.push(
                BindingStackEntry::requested_at(accessor.contextual_key.clone(), &accessor.name)
                    .at(accessor.location.clone()),
            );
            self.visit(&accessor.contextual_key, graph, stack, &mut path)?;
            stack.pop();
        }
        for injector in &node.injectors {
            let key = injector_request_key(self.ctx, &injector.target);
            *self
                .reference_counts
                .entry(key.type_key().clone())
                .or_default() += 1;
            stack.push(
                BindingStackEntry::requested_at(key.clone(), &injector.name)
                    .at(injector.location.clone()),
            );
            self.visit(&key, graph, stack, &mut path)?;
            stack.pop();
        }

        self.sweep_unreached(graph, stack)?;
        self.check_scopes(graph)?;

        let (adjacency, deferrable_edges, implicitly_deferrable) = self.build_adjacency(graph);
        let graph_name = node.graph_name();
        let TopoSortResult {
            sorted_keys,
            deferred_types,
        } = topo_sort(&adjacency, &deferrable_edges, &implicitly_deferrable, |members| {
            cycle_diagnostic(&graph_name, members)
        })?;
        self.deferred.extend(deferred_types);

        debug!(
            graph = %graph_name,
            bindings = sorted_keys.len(),
            deferred = self.deferred.len(),
            "validated graph"
        );
        Ok(ValidatedGraph {
            sorted_keys,
            deferred_types: self.deferred.into_iter().collect(),
            reference_counts: self.reference_counts,
        })
    }

    fn visit(
        &mut self,
        key: &ContextualTypeKey,
        graph: &mut BindingGraph<'ctx>,
        stack: &mut BindingStack,
        path: &mut Vec<PathEdge>,
    ) -> Result<(), FatalDiagnostic> {
        let binding = graph.get_or_create_binding(key, stack)?;
        if binding.is_absent() {
            return Ok(());
        }
        let type_key = binding.type_key().clone();

        if let Some(position) = path.iter().position(|edge| edge.key.eq(&type_key)) {
            // The key is on the current path: a cycle, breakable when any
            // edge in the repeating segment defers.
            let segment_deferrable = key.is_deferrable()
                || path[position..].iter().any(|edge| edge.deferrable)
                || path[position..].iter().any(|edge| {
                    graph
                        .find_binding(&edge.key)
                        .map(|b| b.is_implicitly_deferrable())
                        .unwrap_or(false)
                });
            if segment_deferrable {
                self.deferred.insert(type_key);
                return Ok(());
            }
            if binding.is_into_multibinding() {
                // Aggregation self-references are not cycles.
                return Ok(());
            }
            let cycle: Vec<TypeKey> = path[position..]
                .iter()
                .map(|edge| edge.key.clone())
                .collect();
            let mut message = format!(
                "Found a dependency cycle while processing '{}'.\nCycle: {}\n\n{}",
                stack.graph_name(),
                render_cycle(&cycle),
                stack.render(self.ctx.options.stack_render_limit)
            );
            if binding
                .as_any()
                .downcast_ref::<MultibindingBinding>()
                .is_some()
            {
                message.push_str("\n(cycle passes through a multibinding)");
            }
            return fail_at(
                DiagnosticCode::DependencyCycle,
                message,
                stack.last_location(),
            );
        }

        if !self.expanded.insert(type_key.clone()) {
            return Ok(());
        }

        if let Some(multibinding) = binding.as_any().downcast_ref::<MultibindingBinding>() {
            if multibinding.is_empty() && !multibinding.allow_empty {
                return fail_at(
                    DiagnosticCode::MissingBinding,
                    format!(
                        "multibinding {} has no contributions and does not allow an empty \
                         collection\n\n{}",
                        type_key.render(false),
                        stack.render(self.ctx.options.stack_render_limit)
                    ),
                    stack.last_location(),
                );
            }
        }

        path.push(PathEdge {
            key: type_key.clone(),
            deferrable: key.is_deferrable(),
        });
        let owner_name = binding.name_hint();
        for dependency in binding.dependencies() {
            *self
                .reference_counts
                .entry(dependency.type_key().clone())
                .or_default() += 1;
            let entry = if binding.is_into_multibinding() {
                BindingStackEntry::contributed_to_multibinding(dependency.clone(), &owner_name)
            } else {
                BindingStackEntry::injected_at(dependency.clone(), &owner_name, "")
            };
            stack.push(entry.at(binding.location().cloned()));
            self.visit(&dependency, graph, stack, path)?;
            stack.pop();
        }
        path.pop();

        // Aliases memoize the terminal key they chase to.
        if let Some(alias) = binding.as_any().downcast_ref::<AliasBinding>() {
            if alias.resolved().is_none() {
                let mut terminal = alias.aliased.type_key().clone();
                let mut hops = 0usize;
                while let Some(next) = graph.find_binding(&terminal).and_then(|b| {
                    b.as_any()
                        .downcast_ref::<AliasBinding>()
                        .map(|a| a.aliased.type_key().clone())
                }) {
                    terminal = next;
                    hops += 1;
                    if hops > 64 {
                        break;
                    }
                }
                alias.memoize_resolution(terminal);
            }
        }
        Ok(())
    }

    /// Bindings seeded but not reachable from any root still must have
    /// resolvable dependencies; resolving may grow the graph, so iterate to
    /// a fixpoint.
    fn sweep_unreached(
        &mut self,
        graph: &mut BindingGraph<'ctx>,
        stack: &mut BindingStack,
    ) -> Result<(), FatalDiagnostic> {
        loop {
            let snapshot = graph.bindings_snapshot();
            let before = snapshot.len();
            for (key, binding) in snapshot {
                if graph.is_twin_key(&key) {
                    continue;
                }
                for dependency in binding.dependencies() {
                    if graph.contains(dependency.type_key()) {
                        continue;
                    }
                    stack.push(BindingStackEntry::injected_at(
                        dependency.clone(),
                        &binding.name_hint(),
                        "",
                    ));
                    let created = graph.get_or_create_binding(&dependency, stack);
                    stack.pop();
                    created?;
                }
            }
            if graph.bindings_snapshot().len() == before {
                return Ok(());
            }
        }
    }

    /// Every scoped binding must live in a graph (or ancestor) declaring
    /// that scope.
    fn check_scopes(&self, graph: &BindingGraph<'ctx>) -> Result<(), FatalDiagnostic> {
        let node = graph.node().clone();
        let mut ancestor_scopes = BTreeSet::new();
        for ancestor in node.all_extended_nodes(self.registry) {
            if let Some(ancestor_node) = self.registry.get(&ancestor) {
                ancestor_scopes.extend(ancestor_node.scopes.iter().cloned());
            }
        }
        for (key, binding) in graph.bindings_snapshot() {
            if graph.is_twin_key(&key) {
                continue;
            }
            let scope = match binding.scope() {
                Some(scope) => scope.clone(),
                None => continue,
            };
            if node.scopes.contains(&scope) {
                continue;
            }
            // A binding scoped to an ancestor's scope resolves through the
            // parent overlay; one still hosted here is an error, with a
            // hint at the graph that could own it.
            let declared = node
                .scopes
                .iter()
                .map(|s| s.class_id.short_name().to_owned())
                .collect::<Vec<String>>()
                .join(", ");
            let mut message = format!(
                "{} (scopes '{}') may not reference bindings from different scopes: {} (scoped \
                 to '{}')",
                node.graph_name(),
                declared,
                binding.name_hint(),
                scope.render()
            );
            if ancestor_scopes.contains(&scope) || graph.parent().contains_scope(&scope) {
                message.push_str(&format!(
                    "\nhint: scope {} is declared by an ancestor graph; declare an accessor for \
                     {} there to share one instance",
                    scope.render(),
                    key.render(true)
                ));
            }
            return fail_at(
                DiagnosticCode::IncompatiblyScopedBindings,
                message,
                binding.location().cloned().or_else(|| node.location.clone()),
            );
        }
        Ok(())
    }

    /// Full adjacency over the final binding set. Twin keys are excluded so
    /// a shared multibinding instance is planned exactly once.
    fn build_adjacency(
        &self,
        graph: &BindingGraph<'ctx>,
    ) -> (
        BTreeMap<TypeKey, BTreeSet<TypeKey>>,
        BTreeMap<TypeKey, BTreeSet<TypeKey>>,
        BTreeSet<TypeKey>,
    ) {
        let mut adjacency: BTreeMap<TypeKey, BTreeSet<TypeKey>> = BTreeMap::new();
        let mut deferrable: BTreeMap<TypeKey, BTreeSet<TypeKey>> = BTreeMap::new();
        let mut implicit = BTreeSet::new();
        for (key, binding) in graph.bindings_snapshot() {
            if graph.is_twin_key(&key) {
                continue;
            }
            if binding.is_implicitly_deferrable() {
                implicit.insert(key.clone());
            }
            let entry = adjacency.entry(key.clone()).or_default();
            for dependency in binding.dependencies() {
                if !graph.contains(dependency.type_key()) {
                    // Defaulted-absent dependency; the call site keeps the
                    // default.
                    continue;
                }
                entry.insert(dependency.type_key().clone());
                if dependency.is_deferrable() {
                    deferrable
                        .entry(key.clone())
                        .or_default()
                        .insert(dependency.type_key().clone());
                }
            }
        }
        (adjacency, deferrable, implicit)
    }
}

struct PathEdge {
    key: TypeKey,
    deferrable: bool,
}

/// `A --> B --> A` with short names.
fn render_cycle(cycle: &[TypeKey]) -> String {
    let mut names: Vec<String> = cycle.iter().map(|key| key.render(true)).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    names.join(" --> ")
}

fn cycle_diagnostic(graph_name: &str, members: &[TypeKey]) -> FatalDiagnostic {
    FatalDiagnostic(crate::diagnostics::Diagnostic::new(
        DiagnosticCode::DependencyCycle,
        format!(
            "Found a dependency cycle while processing '{}'.\nCycle: {}",
            graph_name,
            render_cycle(members)
        ),
    ))
}

/// An injector function's request: the members injector of its target.
pub fn injector_request_key(
    ctx: &ResolverContext<'_>,
    target: &ContextualTypeKey,
) -> ContextualTypeKey {
    let injector_type = crate::type_data::TypeData::with_args(
        ctx.class_ids.members_injector_id.clone(),
        vec![target.type_key().type_data().clone()],
    );
    ContextualTypeKey::from_type(&injector_type, None, false, &ctx.class_ids)
}
