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

//! Implicit binding discovery for a requested key.
//!
//! Explicitly declared providers and binds are seeded into the graph up
//! front; this lookup answers everything else: injected classes, objects,
//! assisted factories, members injectors, defaulted parameters, and
//! parent-graph overlays.

use crate::annotation::AnnotationData;
use crate::bindings::{
    AbsentBinding, AssistedFactoryBinding, Binding, ConstructorInjectedBinding,
    GraphDependencyBinding, MembersInjectedBinding, ObjectClassBinding,
};
use crate::declarations::{substitution_for, ClassDecl, ClassKind, FunctionDecl};
use crate::graph_node::DependencyGraphNode;
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::parameters::{Parameter, Parameters};
use crate::parent::ParentContext;
use crate::resolver::ResolverContext;
use crate::type_data::TypeData;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

#[derive(Debug, Clone)]
enum LookupState {
    /// Reentrant request for a key currently being constructed; surfaced to
    /// the caller as "nothing yet", which the validator treats as a cycle
    /// candidate.
    Resolving,
    Resolved(Vec<Rc<dyn Binding>>),
}

pub struct BindingLookup<'ctx> {
    ctx: &'ctx ResolverContext<'ctx>,
    node: Rc<DependencyGraphNode>,
    cache: RefCell<HashMap<ContextualTypeKey, LookupState>>,
}

impl<'ctx> BindingLookup<'ctx> {
    pub fn new(ctx: &'ctx ResolverContext<'ctx>, node: Rc<DependencyGraphNode>) -> Self {
        BindingLookup {
            ctx,
            node,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Bindings applying to `key`, possibly none. The first entry is the
    /// binding for the key itself; the rest are companions (injected-member
    /// bindings) that belong in the graph alongside it.
    pub fn lookup(
        &self,
        key: &ContextualTypeKey,
        parent: &mut ParentContext,
    ) -> Result<Vec<Rc<dyn Binding>>, crate::diagnostics::FatalDiagnostic> {
        match self.cache.borrow().get(key) {
            Some(LookupState::Resolved(found)) => return Ok(found.clone()),
            Some(LookupState::Resolving) => return Ok(Vec::new()),
            None => {}
        }
        self.cache
            .borrow_mut()
            .insert(key.clone(), LookupState::Resolving);

        let candidates = self.create_candidates(key)?;
        let result = self.overlay_parent(key, candidates, parent);

        self.cache
            .borrow_mut()
            .insert(key.clone(), LookupState::Resolved(result.clone()));
        Ok(result)
    }

    fn create_candidates(
        &self,
        key: &ContextualTypeKey,
    ) -> Result<Vec<Rc<dyn Binding>>, crate::diagnostics::FatalDiagnostic> {
        let class_ids = &self.ctx.class_ids;
        let canonical = key.type_key().type_data().clone();

        if class_ids.is_members_injector(&canonical.class_id) && canonical.args.len() == 1 {
            let target = &canonical.args[0];
            if let Some(binding) = self.members_injected(key.clone(), target, false, "") {
                return Ok(vec![binding]);
            }
            return Ok(Vec::new());
        }

        let class = match self.ctx.index.class(&canonical.class_id) {
            Some(class) => class,
            None => return Ok(self.absent_or_empty(key)),
        };
        if let Some(tracker) = self.ctx.tracker {
            tracker.record_class(&class.class_id);
        }

        if class.kind == ClassKind::Object {
            trace!(key = %key.type_key(), "object class binding");
            let binding: Rc<dyn Binding> = Rc::new(ObjectClassBinding {
                contextual_key: key.clone(),
                class_id: class.class_id.clone(),
                annotations: class.annotations.clone(),
                location: class.location.clone(),
            });
            return Ok(vec![binding]);
        }

        if let Some(constructor) = class.inject_constructor(class_ids) {
            return Ok(self.constructor_injected(key, class, &constructor.clone(), &canonical));
        }

        if class.has_annotation(&class_ids.assisted_factory) {
            if let Some(binding) = self.assisted_factory(key, class) {
                return Ok(vec![binding]);
            }
        }

        Ok(self.absent_or_empty(key))
    }

    fn absent_or_empty(&self, key: &ContextualTypeKey) -> Vec<Rc<dyn Binding>> {
        if key.has_default() {
            let binding: Rc<dyn Binding> = Rc::new(AbsentBinding {
                contextual_key: key.clone(),
            });
            return vec![binding];
        }
        Vec::new()
    }

    /// A class with an injectable constructor, remapped through the concrete
    /// call-site type arguments, plus members-injected companions.
    fn constructor_injected(
        &self,
        key: &ContextualTypeKey,
        class: &ClassDecl,
        constructor: &FunctionDecl,
        canonical: &TypeData,
    ) -> Vec<Rc<dyn Binding>> {
        let class_ids = &self.ctx.class_ids;
        let index = self.ctx.index;
        let substitutions = substitution_for(class, canonical);

        let remapped_constructor = remap_function(constructor, &substitutions);
        let parameters = Parameters::from_function(&remapped_constructor, index, class_ids);
        let is_assisted = !parameters.assisted().is_empty();

        let mut companions: Vec<Rc<dyn Binding>> = Vec::new();
        let mut injected_members = Vec::new();
        let member_parameters = self.injectable_members(class, &substitutions);
        if !member_parameters.is_empty() {
            for parameter in member_parameters.iter() {
                injected_members.push(parameter.contextual_key.clone());
            }
            // The separately generated injector for this class.
            let injector_type = TypeData::with_args(
                class_ids.members_injector_id.clone(),
                vec![canonical.clone()],
            );
            let injector_key = ContextualTypeKey::from_type(&injector_type, None, false, class_ids);
            companions.push(Rc::new(MembersInjectedBinding {
                contextual_key: injector_key,
                parameters: Parameters::new(member_parameters),
                function_name: String::new(),
                is_from_injector_function: false,
                target_class: class.class_id.clone(),
                location: class.location.clone(),
            }));
        }

        let scope = index.scope_annotation(&class.annotations, class_ids);
        let binding: Rc<dyn Binding> = Rc::new(ConstructorInjectedBinding {
            contextual_key: key.clone(),
            class_id: class.class_id.clone(),
            constructor: remapped_constructor,
            parameters,
            scope,
            annotations: class.annotations.clone(),
            injected_members,
            is_assisted,
            location: class.location.clone(),
        });
        let mut result = vec![binding];
        result.append(&mut companions);
        result
    }

    fn assisted_factory(
        &self,
        key: &ContextualTypeKey,
        class: &ClassDecl,
    ) -> Option<Rc<dyn Binding>> {
        let class_ids = &self.ctx.class_ids;
        let function = class.single_abstract_function()?.clone();
        let target = ContextualTypeKey::from_type(&function.return_type, None, false, class_ids);
        let parameters = Parameters::from_function(&function, self.ctx.index, class_ids);
        if let Some(tracker) = self.ctx.tracker {
            tracker.record_function(&class.class_id, &function.name);
        }
        Some(Rc::new(AssistedFactoryBinding {
            contextual_key: key.clone(),
            class_id: class.class_id.clone(),
            target,
            function,
            parameters,
            location: class.location.clone(),
        }))
    }

    /// A members-injected binding for `target`, scanning the class and its
    /// ancestors for injectable members in declaration order.
    pub fn members_injected(
        &self,
        key: ContextualTypeKey,
        target: &TypeData,
        is_from_injector_function: bool,
        function_name: &str,
    ) -> Option<Rc<dyn Binding>> {
        let class = self.ctx.index.class(&target.class_id)?;
        let substitutions = substitution_for(class, target);
        let parameters = self.injectable_members(class, &substitutions);
        Some(Rc::new(MembersInjectedBinding {
            contextual_key: key,
            parameters: Parameters::new(parameters),
            function_name: function_name.to_owned(),
            is_from_injector_function,
            target_class: class.class_id.clone(),
            location: class.location.clone(),
        }))
    }

    /// Injectable fields and setter functions of `class` and its ancestors.
    fn injectable_members(
        &self,
        class: &ClassDecl,
        substitutions: &HashMap<String, TypeData>,
    ) -> Vec<Parameter> {
        let class_ids = &self.ctx.class_ids;
        let index = self.ctx.index;
        let mut result = Vec::new();
        let mut classes: Vec<&ClassDecl> = vec![class];
        for supertype in index.all_supertypes(&class.class_id) {
            if let Some(decl) = index.class(&supertype.class_id) {
                classes.push(decl);
            }
        }
        // Ancestors first so construction order matches initialization order.
        for decl in classes.into_iter().rev() {
            for field in &decl.fields {
                if !field.has_annotation(&class_ids.inject) {
                    continue;
                }
                let qualifier = index.qualifier_annotation(&field.annotations, class_ids);
                result.push(Parameter {
                    name: field.name.clone(),
                    contextual_key: ContextualTypeKey::from_type(
                        &field.field_type.substitute(substitutions),
                        qualifier,
                        false,
                        class_ids,
                    ),
                    is_assisted: false,
                    assisted_identifier: String::new(),
                    is_bound_instance: false,
                    location: field.location.clone(),
                });
            }
            for function in &decl.functions {
                if !function.has_annotation(&class_ids.inject) || function.is_abstract {
                    continue;
                }
                for parameter in &function.parameters {
                    let qualifier = index.qualifier_annotation(&parameter.annotations, class_ids);
                    result.push(Parameter {
                        name: parameter.name.clone(),
                        contextual_key: ContextualTypeKey::from_type(
                            &parameter.param_type.substitute(substitutions),
                            qualifier,
                            parameter.has_default,
                            class_ids,
                        ),
                        is_assisted: false,
                        assisted_identifier: String::new(),
                        is_bound_instance: false,
                        location: function.location.clone(),
                    });
                }
            }
        }
        result
    }

    /// Parent-graph overlay: a key the parent exposes, or a scoped candidate
    /// whose scope an ancestor holds, resolves through the parent instead.
    /// The parent is marked so its plan keeps the provider field reachable.
    fn overlay_parent(
        &self,
        key: &ContextualTypeKey,
        candidates: Vec<Rc<dyn Binding>>,
        parent: &mut ParentContext,
    ) -> Vec<Rc<dyn Binding>> {
        if parent.is_empty() {
            return candidates;
        }
        let candidate_scope: Option<AnnotationData> =
            candidates.first().and_then(|c| c.scope().cloned());
        let locally_scoped = candidate_scope
            .as_ref()
            .map(|scope| self.node.scopes.contains(scope))
            .unwrap_or(false);

        let replace = if parent.contains(key.type_key()) {
            candidates.is_empty() || candidate_scope.is_some()
        } else {
            // Retroactive introduction by matching ancestor scope.
            candidate_scope.is_some() && !locally_scoped
        };
        if !replace {
            return candidates;
        }
        let owner = parent.mark(key.type_key(), candidate_scope.as_ref());
        match owner {
            Some(owner) => {
                trace!(key = %key.type_key(), owner = %owner, "parent overlay");
                let binding: Rc<dyn Binding> = Rc::new(GraphDependencyBinding {
                    contextual_key: key.clone(),
                    owner_key: owner,
                    getter: accessor_name_for(key.type_key()),
                    is_provider_field_accessor: true,
                    location: None,
                });
                vec![binding]
            }
            None => candidates,
        }
    }
}

/// Generated accessor name on the owning graph implementation.
pub fn accessor_name_for(key: &TypeKey) -> String {
    let mut name: String = key
        .render(true)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    name.make_ascii_lowercase();
    name
}

fn remap_function(function: &FunctionDecl, substitutions: &HashMap<String, TypeData>) -> FunctionDecl {
    if substitutions.is_empty() {
        return function.clone();
    }
    let mut result = function.clone();
    result.return_type = function.return_type.substitute(substitutions);
    for parameter in &mut result.parameters {
        parameter.param_type = parameter.param_type.substitute(substitutions);
    }
    result
}
