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

//! Accumulates bindings for one graph and resolves requests lazily.

use crate::bindings::{Binding, MultibindingBinding};
use crate::diagnostics::{fail_at, DiagnosticCode, FatalDiagnostic};
use crate::graph_node::DependencyGraphNode;
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::lookup::BindingLookup;
use crate::memoized::MemoizedSequence;
use crate::parent::ParentContext;
use crate::resolver::ResolverContext;
use crate::stack::BindingStack;
use crate::type_data::TypeData;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::trace;

pub struct BindingGraph<'ctx> {
    ctx: &'ctx ResolverContext<'ctx>,
    node: Rc<DependencyGraphNode>,
    lookup: BindingLookup<'ctx>,
    parent: ParentContext,
    bindings: BTreeMap<TypeKey, Rc<dyn Binding>>,
    /// Typed view of the multibinding entries in `bindings`.
    multibindings: BTreeMap<TypeKey, Rc<MultibindingBinding>>,
    /// Secondary keys (the `Map<K, Provider<V>>` twins) that must not be
    /// emitted as their own plan slots.
    twin_keys: BTreeMap<TypeKey, TypeKey>,
}

impl<'ctx> BindingGraph<'ctx> {
    pub fn new(
        ctx: &'ctx ResolverContext<'ctx>,
        node: Rc<DependencyGraphNode>,
        parent: ParentContext,
    ) -> Self {
        BindingGraph {
            ctx,
            lookup: BindingLookup::new(ctx, node.clone()),
            node,
            parent,
            bindings: BTreeMap::new(),
            multibindings: BTreeMap::new(),
            twin_keys: BTreeMap::new(),
        }
    }

    pub fn node(&self) -> &Rc<DependencyGraphNode> {
        &self.node
    }

    pub fn parent_mut(&mut self) -> &mut ParentContext {
        &mut self.parent
    }

    pub fn parent(&self) -> &ParentContext {
        &self.parent
    }

    pub fn into_parent(self) -> ParentContext {
        self.parent
    }

    pub fn lookup(&self) -> &BindingLookup<'ctx> {
        &self.lookup
    }

    /// Registers a binding. `Absent` is silently dropped; a duplicate for an
    /// occupied slot is a diagnostic.
    pub fn add_binding(
        &mut self,
        binding: Rc<dyn Binding>,
        stack: &BindingStack,
    ) -> Result<(), FatalDiagnostic> {
        if binding.is_absent() {
            return Ok(());
        }
        let key = binding.type_key().clone();
        if let Some(existing) = self.bindings.get(&key) {
            if Rc::ptr_eq(existing, &binding) {
                return Ok(());
            }
            return <dyn Binding>::duplicated(existing.as_ref(), binding.as_ref(), stack);
        }
        trace!(key = %key, binding = %binding.name_hint(), "add binding");
        self.bindings.insert(key, binding);
        Ok(())
    }

    /// Returns the cached binding for the request, or discovers one through
    /// the lookup. Missing bindings report with similarity hints.
    pub fn get_or_create_binding(
        &mut self,
        key: &ContextualTypeKey,
        stack: &mut BindingStack,
    ) -> Result<Rc<dyn Binding>, FatalDiagnostic> {
        if let Some(found) = self.bindings.get(key.type_key()) {
            return Ok(found.clone());
        }
        let candidates = self.lookup.lookup(key, &mut self.parent)?;
        if candidates.is_empty() {
            return self.missing_binding(key, stack);
        }
        for (position, candidate) in candidates.iter().enumerate() {
            // Companion bindings (injected-member injectors) may have been
            // registered already through another route.
            if position > 0 && self.bindings.contains_key(candidate.type_key()) {
                continue;
            }
            self.add_binding(candidate.clone(), stack)?;
        }
        Ok(candidates[0].clone())
    }

    /// Idempotently creates the Set or Map multibinding for `key`. Map
    /// multibindings also answer to the provider-valued form of their key.
    pub fn get_or_create_multibinding(
        &mut self,
        key: &ContextualTypeKey,
        is_map: bool,
        allow_empty: bool,
        stack: &BindingStack,
    ) -> Result<Rc<MultibindingBinding>, FatalDiagnostic> {
        if let Some(existing) = self.multibindings.get(key.type_key()) {
            return Ok(existing.clone());
        }
        if let Some(existing) = self.bindings.get(key.type_key()) {
            return <dyn Binding>::duplicated(
                existing.as_ref(),
                &MultibindingBinding::new(key.clone(), is_map, allow_empty, None),
                stack,
            );
        }
        let multibinding = Rc::new(MultibindingBinding::new(
            key.clone(),
            is_map,
            allow_empty,
            None,
        ));
        self.bindings
            .insert(key.type_key().clone(), multibinding.clone());
        self.multibindings
            .insert(key.type_key().clone(), multibinding.clone());
        if is_map {
            let twin = self.provider_valued_map_key(key.type_key());
            if let Some(twin) = twin {
                self.twin_keys.insert(twin.clone(), key.type_key().clone());
                self.bindings.insert(twin.clone(), multibinding.clone());
                self.multibindings.insert(twin, multibinding.clone());
            }
        }
        Ok(multibinding)
    }

    pub fn find_multibinding(&self, key: &TypeKey) -> Option<Rc<MultibindingBinding>> {
        self.multibindings.get(key).cloned()
    }

    /// `Map<K, V>` -> `Map<K, Provider<V>>`, same qualifier.
    fn provider_valued_map_key(&self, key: &TypeKey) -> Option<TypeKey> {
        let type_data = key.type_data();
        if !self.ctx.class_ids.is_map(&type_data.class_id) || type_data.args.len() != 2 {
            return None;
        }
        let provider_value = TypeData::with_args(
            self.ctx.class_ids.provider_id.clone(),
            vec![type_data.args[1].clone()],
        );
        let wrapped_map = TypeData::with_args(
            type_data.class_id.clone(),
            vec![type_data.args[0].clone(), provider_value],
        );
        Some(TypeKey::new(wrapped_map, key.qualifier().cloned()))
    }

    pub fn find_binding(&self, key: &TypeKey) -> Option<Rc<dyn Binding>> {
        self.bindings.get(key).cloned()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.bindings.contains_key(key)
    }

    /// True for the secondary registration of a map multibinding.
    pub fn is_twin_key(&self, key: &TypeKey) -> bool {
        self.twin_keys.contains_key(key)
    }

    pub fn bindings_snapshot(&self) -> Vec<(TypeKey, Rc<dyn Binding>)> {
        self.bindings
            .iter()
            .map(|(key, binding)| (key.clone(), binding.clone()))
            .collect()
    }

    /// The similarity search runs only on failure; it scans the graph and
    /// the declaration index for near misses worth mentioning.
    fn missing_binding<T>(
        &self,
        key: &ContextualTypeKey,
        stack: &BindingStack,
    ) -> Result<T, FatalDiagnostic> {
        let mut hints = Vec::new();
        let max_hints = self.ctx.options.max_similarity_hints;
        let wanted = key.type_key().type_data();

        for (other_key, binding) in &self.bindings {
            if hints.len() >= max_hints {
                break;
            }
            if other_key.type_data().eq(wanted) && other_key.ne(key.type_key()) {
                hints.push(format!(
                    "Different qualifier: {} ({})",
                    other_key.render(true),
                    binding.name_hint()
                ));
                continue;
            }
            if let Some(multibinding) = binding.as_any().downcast_ref::<MultibindingBinding>() {
                let element_matches = multibinding
                    .contextual_type_key()
                    .type_key()
                    .type_data()
                    .args
                    .iter()
                    .any(|arg| arg.eq(wanted));
                if element_matches {
                    hints.push(format!(
                        "Multibinding: {} aggregates this type",
                        other_key.render(true)
                    ));
                }
            }
        }

        // Sub/supertype scan; memoized so both passes pull the class list
        // once.
        let classes = MemoizedSequence::new(self.ctx.index.classes());
        for class in classes.iter() {
            if hints.len() >= max_hints {
                break;
            }
            let candidate = class.declared_type();
            if candidate.class_id.eq(&wanted.class_id) {
                continue;
            }
            if self.ctx.index.is_subtype(&candidate, wanted)
                && self.bindings.contains_key(&TypeKey::simple(candidate.clone()))
            {
                hints.push(format!("Subtype: {}", candidate.render(true)));
            }
        }
        for class in classes.iter() {
            if hints.len() >= max_hints {
                break;
            }
            let candidate = class.declared_type();
            if candidate.class_id.eq(&wanted.class_id) {
                continue;
            }
            if self.ctx.index.is_subtype(wanted, &candidate)
                && self.bindings.contains_key(&TypeKey::simple(candidate.clone()))
            {
                hints.push(format!("Supertype: {}", candidate.render(true)));
            }
        }

        let mut message = format!(
            "cannot find an implementation for {}\n  requested at: {}\n",
            key.type_key().render(false),
            stack.last_entry_or_graph(),
        );
        if !hints.is_empty() {
            message.push_str("\nSimilar bindings:\n");
            for hint in hints {
                message.push_str(&format!("  - {}\n", hint));
            }
        }
        message.push('\n');
        message.push_str(&stack.render(self.ctx.options.stack_render_limit));
        fail_at(
            DiagnosticCode::MissingBinding,
            message,
            stack.last_location(),
        )
    }
}
