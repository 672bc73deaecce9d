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

//! Per-graph declaration node: everything discovery extracts from a graph
//! class before binding resolution starts.

use crate::annotation::AnnotationData;
use crate::contributions::Contribution;
use crate::declarations::{ClassDecl, FunctionDecl};
use crate::diagnostics::{fail_at, Diagnostic, DiagnosticCode, FatalDiagnostic, Location};
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::metadata::GraphMetadata;
use crate::parameters::Parameter;
use crate::resolver::ResolverContext;
use crate::type_data::{ClassId, TypeData};
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::debug;

/// A provider function, with the class that declares it.
#[derive(Debug, Clone)]
pub struct ProviderFactory {
    pub owner: ClassId,
    pub function: FunctionDecl,
    /// True when the owner is the graph's companion object.
    pub is_companion: bool,
}

#[derive(Debug, Clone)]
pub struct BindsCallable {
    pub owner: ClassId,
    pub function: FunctionDecl,
}

#[derive(Debug, Clone)]
pub struct MultibindsCallable {
    pub owner: ClassId,
    pub function: FunctionDecl,
    pub allow_empty: bool,
}

#[derive(Debug, Clone)]
pub struct AccessorDecl {
    pub name: String,
    pub contextual_key: ContextualTypeKey,
    pub location: Option<Location>,
}

#[derive(Debug, Clone)]
pub struct InjectorDecl {
    pub name: String,
    pub target: ContextualTypeKey,
    pub location: Option<Location>,
}

/// The graph's creator function: bound instances and included graphs
/// supplied at construction.
#[derive(Debug, Clone)]
pub struct CreatorDecl {
    pub class_id: ClassId,
    pub function: FunctionDecl,
    pub bound_instances: Vec<Parameter>,
    pub included_graphs: Vec<TypeData>,
}

/// A contributed binding surviving the merge: `impl_type` bound at
/// `bound_key`.
#[derive(Debug, Clone)]
pub struct ContributedBinding {
    pub impl_type: TypeData,
    pub bound_key: TypeKey,
    pub rank: i64,
    pub location: Option<Location>,
}

#[derive(Debug)]
pub struct DependencyGraphNode {
    pub type_key: TypeKey,
    pub class_id: ClassId,
    pub supertypes: Vec<TypeData>,
    pub is_extendable: bool,
    pub is_external: bool,
    pub scopes: BTreeSet<AnnotationData>,
    pub aggregation_scopes: Vec<ClassId>,
    pub provider_factories: Vec<ProviderFactory>,
    pub accessors: Vec<AccessorDecl>,
    pub injectors: Vec<InjectorDecl>,
    pub binds_callables: Vec<BindsCallable>,
    pub multibinds_callables: Vec<MultibindsCallable>,
    pub contributed_bindings: Vec<ContributedBinding>,
    pub binding_containers: BTreeSet<ClassId>,
    pub creator: Option<CreatorDecl>,
    /// Graph classes reachable through creator parameters.
    pub included_graphs: Vec<ClassId>,
    /// Extension classes this graph can instantiate.
    pub graph_extensions: Vec<ClassId>,
    /// Parent chain for an extension graph, nearest first.
    pub extended_graphs: Vec<ClassId>,
    pub location: Option<Location>,
    all_included: OnceCell<Vec<ClassId>>,
    all_extended: OnceCell<Vec<ClassId>>,
    proto: RefCell<Option<GraphMetadata>>,
}

impl DependencyGraphNode {
    pub fn graph_name(&self) -> String {
        self.class_id.dotted()
    }

    /// Transitive closure of included graphs, this node excluded, cached.
    pub fn all_included_nodes(
        &self,
        registry: &BTreeMap<ClassId, Rc<DependencyGraphNode>>,
    ) -> Vec<ClassId> {
        self.all_included
            .get_or_init(|| transitive_closure(&self.included_graphs, registry, |n| &n.included_graphs))
            .clone()
    }

    /// Transitive closure of extended parents, nearest first, cached.
    pub fn all_extended_nodes(
        &self,
        registry: &BTreeMap<ClassId, Rc<DependencyGraphNode>>,
    ) -> Vec<ClassId> {
        self.all_extended
            .get_or_init(|| transitive_closure(&self.extended_graphs, registry, |n| &n.extended_graphs))
            .clone()
    }

    /// Attaches the persisted metadata once the plan is computed.
    pub fn attach_proto(&self, metadata: GraphMetadata) {
        *self.proto.borrow_mut() = Some(metadata);
    }

    pub fn proto(&self) -> Option<GraphMetadata> {
        self.proto.borrow().clone()
    }
}

fn transitive_closure<F>(
    seeds: &[ClassId],
    registry: &BTreeMap<ClassId, Rc<DependencyGraphNode>>,
    step: F,
) -> Vec<ClassId>
where
    F: Fn(&DependencyGraphNode) -> &Vec<ClassId>,
{
    let mut result = Vec::new();
    let mut seen = BTreeSet::new();
    let mut queue: Vec<ClassId> = seeds.to_vec();
    while let Some(class_id) = queue.pop() {
        if !seen.insert(class_id.clone()) {
            continue;
        }
        if let Some(node) = registry.get(&class_id) {
            queue.extend(step(node).iter().cloned());
        }
        result.push(class_id);
    }
    result.sort();
    result
}

/// Builds a `DependencyGraphNode` from a graph class declaration, running
/// declaration validation and the contribution merge.
pub struct GraphNodeBuilder<'a, 'ctx> {
    ctx: &'a ResolverContext<'ctx>,
}

impl<'a, 'ctx> GraphNodeBuilder<'a, 'ctx> {
    pub fn new(ctx: &'a ResolverContext<'ctx>) -> Self {
        GraphNodeBuilder { ctx }
    }

    pub fn build(
        &self,
        graph_class: &ClassId,
        extended_graphs: Vec<ClassId>,
    ) -> Result<DependencyGraphNode, FatalDiagnostic> {
        let index = self.ctx.index;
        let class_ids = &self.ctx.class_ids;
        let class = match index.class(graph_class) {
            Some(class) => class,
            None => {
                return fail_at(
                    DiagnosticCode::AggregationError,
                    format!("unknown graph class {}", graph_class.dotted()),
                    None,
                )
            }
        };
        let annotation = class
            .annotation(&class_ids.dependency_graph)
            .or_else(|| class.annotation(&class_ids.graph_extension));
        let annotation = match annotation {
            Some(annotation) => annotation.clone(),
            None => {
                return fail_at(
                    DiagnosticCode::AggregationError,
                    format!(
                        "{} is not annotated as a dependency graph",
                        graph_class.dotted()
                    ),
                    class.location.clone(),
                )
            }
        };

        let aggregation_scopes: Vec<ClassId> = annotation
            .class_value("scope")
            .into_iter()
            .cloned()
            .chain(annotation.class_list_value("additionalScopes"))
            .collect();
        let mut scopes: BTreeSet<AnnotationData> = aggregation_scopes
            .iter()
            .map(|scope| AnnotationData::new(scope.clone()))
            .collect();
        if let Some(scope) = index.scope_annotation(&class.annotations, class_ids) {
            scopes.insert(scope);
        }

        let binding_containers =
            self.collect_binding_containers(annotation.class_list_value("bindingContainers"));

        let mut node = DependencyGraphNode {
            type_key: TypeKey::simple(TypeData::new(graph_class.clone())),
            class_id: graph_class.clone(),
            supertypes: index.all_supertypes(graph_class),
            is_extendable: annotation.bool_value("isExtendable").unwrap_or(false),
            is_external: class.module_name != index.current_module(),
            scopes,
            aggregation_scopes,
            provider_factories: Vec::new(),
            accessors: Vec::new(),
            injectors: Vec::new(),
            binds_callables: Vec::new(),
            multibinds_callables: Vec::new(),
            contributed_bindings: Vec::new(),
            binding_containers,
            creator: None,
            included_graphs: Vec::new(),
            graph_extensions: Vec::new(),
            extended_graphs,
            location: class.location.clone(),
            all_included: OnceCell::new(),
            all_extended: OnceCell::new(),
            proto: RefCell::new(None),
        };

        self.collect_members(class, &mut node)?;
        for supertype in node.supertypes.clone() {
            if let Some(decl) = index.class(&supertype.class_id) {
                self.collect_members(decl, &mut node)?;
            }
        }
        if let Some(companion) = &class.companion {
            if let Some(decl) = index.class(companion) {
                self.collect_factories(decl, true, &mut node)?;
            }
        }
        for container in node.binding_containers.clone() {
            if let Some(decl) = index.class(&container) {
                self.collect_factories(decl, false, &mut node)?;
                self.collect_binds(decl, &mut node)?;
            }
        }

        self.collect_creator(&annotation, &mut node)?;
        self.merge_contributions(&annotation, &mut node)?;

        // Accessors returning extension classes (or their creators)
        // instantiate child graphs.
        let returned_classes: Vec<ClassId> = node
            .accessors
            .iter()
            .map(|accessor| accessor.contextual_key.type_key().class_id().clone())
            .collect();
        for returned in returned_classes {
            let direct = index
                .class(&returned)
                .map(|decl| decl.has_annotation(&class_ids.graph_extension))
                .unwrap_or(false);
            if direct {
                if !node.graph_extensions.contains(&returned) {
                    node.graph_extensions.push(returned);
                }
                continue;
            }
            for class in index.classes() {
                let created = class
                    .annotation(&class_ids.graph_extension)
                    .and_then(|a| a.class_value("creator"))
                    .map(|creator| creator.eq(&returned))
                    .unwrap_or(false);
                if created && !node.graph_extensions.contains(&class.class_id) {
                    node.graph_extensions.push(class.class_id.clone());
                }
            }
        }

        debug!(
            graph = %node.graph_name(),
            factories = node.provider_factories.len(),
            accessors = node.accessors.len(),
            "discovered graph node"
        );
        Ok(node)
    }

    /// Containers include other containers; the closure is flattened here.
    fn collect_binding_containers(&self, seeds: Vec<ClassId>) -> BTreeSet<ClassId> {
        let class_ids = &self.ctx.class_ids;
        let mut result = BTreeSet::new();
        let mut queue = seeds;
        while let Some(container) = queue.pop() {
            if !result.insert(container.clone()) {
                continue;
            }
            if let Some(decl) = self.ctx.index.class(&container) {
                if let Some(annotation) = decl.annotation(&class_ids.binding_container) {
                    queue.extend(annotation.class_list_value("includes"));
                }
            }
        }
        result
    }

    fn collect_members(
        &self,
        class: &ClassDecl,
        node: &mut DependencyGraphNode,
    ) -> Result<(), FatalDiagnostic> {
        let index = self.ctx.index;
        let class_ids = &self.ctx.class_ids;
        for function in &class.functions {
            let provides = function.has_annotation(&class_ids.provides);
            let binds = function.has_annotation(&class_ids.binds);
            let multibinds = function.has_annotation(&class_ids.multibinds);
            if function.is_override && (provides || binds) {
                return fail_at(
                    DiagnosticCode::ProviderOverrides,
                    format!(
                        "{}.{} overrides an inherited provider declaration, which is not allowed",
                        class.class_id.dotted(),
                        function.name
                    ),
                    function.location.clone(),
                );
            }
            if provides {
                self.validate_provides(class, function)?;
                node.provider_factories.push(ProviderFactory {
                    owner: class.class_id.clone(),
                    function: function.clone(),
                    is_companion: false,
                });
                continue;
            }
            if binds {
                self.validate_binds(class, function)?;
                node.binds_callables.push(BindsCallable {
                    owner: class.class_id.clone(),
                    function: function.clone(),
                });
                continue;
            }
            if multibinds {
                let allow_empty = self.validate_multibinds(class, function)?;
                node.multibinds_callables.push(MultibindsCallable {
                    owner: class.class_id.clone(),
                    function: function.clone(),
                    allow_empty,
                });
                continue;
            }
            if !function.is_abstract {
                continue;
            }
            if function.parameters.is_empty()
                && function.return_type.class_id.ne(&class_ids.unit_id)
            {
                let qualifier = index.qualifier_annotation(&function.annotations, class_ids);
                let duplicate = node.accessors.iter().any(|a| a.name == function.name);
                if !duplicate {
                    node.accessors.push(AccessorDecl {
                        name: function.name.clone(),
                        contextual_key: ContextualTypeKey::from_type(
                            &function.return_type,
                            qualifier,
                            false,
                            class_ids,
                        ),
                        location: function.location.clone(),
                    });
                }
                continue;
            }
            if function.parameters.len() == 1
                && function.return_type.class_id.eq(&class_ids.unit_id)
            {
                let target = &function.parameters[0];
                node.injectors.push(InjectorDecl {
                    name: function.name.clone(),
                    target: ContextualTypeKey::from_type(&target.param_type, None, false, class_ids),
                    location: function.location.clone(),
                });
            }
        }
        Ok(())
    }

    fn collect_factories(
        &self,
        class: &ClassDecl,
        is_companion: bool,
        node: &mut DependencyGraphNode,
    ) -> Result<(), FatalDiagnostic> {
        for function in &class.functions {
            if function.has_annotation(&self.ctx.class_ids.provides) {
                self.validate_provides(class, function)?;
                node.provider_factories.push(ProviderFactory {
                    owner: class.class_id.clone(),
                    function: function.clone(),
                    is_companion,
                });
            }
        }
        Ok(())
    }

    fn collect_binds(
        &self,
        class: &ClassDecl,
        node: &mut DependencyGraphNode,
    ) -> Result<(), FatalDiagnostic> {
        for function in &class.functions {
            if function.has_annotation(&self.ctx.class_ids.binds) {
                self.validate_binds(class, function)?;
                node.binds_callables.push(BindsCallable {
                    owner: class.class_id.clone(),
                    function: function.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_provides(
        &self,
        class: &ClassDecl,
        function: &FunctionDecl,
    ) -> Result<(), FatalDiagnostic> {
        let class_ids = &self.ctx.class_ids;
        if function.is_abstract {
            return fail_at(
                DiagnosticCode::ProvidesError,
                format!(
                    "provider {}.{} must have a body",
                    class.class_id.dotted(),
                    function.name
                ),
                function.location.clone(),
            );
        }
        if function.return_type.class_id.eq(&class_ids.unit_id) {
            return fail_at(
                DiagnosticCode::ProvidesError,
                format!(
                    "provider {}.{} must return a value",
                    class.class_id.dotted(),
                    function.name
                ),
                function.location.clone(),
            );
        }
        // Redundant provider over a constructor-injectable class: allowed,
        // but worth flagging.
        if let Some(target) = self.ctx.index.class(&function.return_type.class_id) {
            if target.inject_constructor(class_ids).is_some()
                && self
                    .ctx
                    .index
                    .qualifier_annotation(&function.annotations, class_ids)
                    .is_none()
            {
                self.ctx.reporter.warning(&Diagnostic::new(
                    DiagnosticCode::ProvidesError,
                    format!(
                        "provider {}.{} is redundant: {} is constructor injectable",
                        class.class_id.dotted(),
                        function.name,
                        function.return_type.render(true)
                    ),
                ));
            }
        }
        Ok(())
    }

    fn validate_binds(
        &self,
        class: &ClassDecl,
        function: &FunctionDecl,
    ) -> Result<(), FatalDiagnostic> {
        let located = |message: String| {
            fail_at(
                DiagnosticCode::BindsError,
                message,
                function.location.clone(),
            )
        };
        if !function.is_abstract {
            return located(format!(
                "binds declaration {}.{} must be abstract",
                class.class_id.dotted(),
                function.name
            ));
        }
        if function.parameters.len() != 1 {
            return located(format!(
                "binds declaration {}.{} must take exactly one parameter",
                class.class_id.dotted(),
                function.name
            ));
        }
        let source = &function.parameters[0].param_type;
        if !self.ctx.index.is_subtype(source, &function.return_type) {
            return located(format!(
                "binds declaration {}.{} binds {} which is not a subtype of {}",
                class.class_id.dotted(),
                function.name,
                source.render(true),
                function.return_type.render(true)
            ));
        }
        Ok(())
    }

    /// Returns the declaration's `allowEmpty` once shape checks pass.
    fn validate_multibinds(
        &self,
        class: &ClassDecl,
        function: &FunctionDecl,
    ) -> Result<bool, FatalDiagnostic> {
        let class_ids = &self.ctx.class_ids;
        let located = |message: String| {
            fail_at(
                DiagnosticCode::MultibindsError,
                message,
                function.location.clone(),
            )
        };
        if !function.is_abstract {
            return located(format!(
                "multibinds declaration {}.{} must be abstract",
                class.class_id.dotted(),
                function.name
            ));
        }
        if self
            .ctx
            .index
            .scope_annotation(&function.annotations, class_ids)
            .is_some()
        {
            return located(format!(
                "multibinds declaration {}.{} must not be scoped",
                class.class_id.dotted(),
                function.name
            ));
        }
        let return_type = &function.return_type;
        let is_set = class_ids.is_set(&return_type.class_id) && return_type.args.len() == 1;
        let is_map = class_ids.is_map(&return_type.class_id) && return_type.args.len() == 2;
        if !is_set && !is_map {
            return located(format!(
                "multibinds declaration {}.{} must return a Set or a Map",
                class.class_id.dotted(),
                function.name
            ));
        }
        for arg in &return_type.args {
            if arg.nullable || arg.type_variable {
                return located(format!(
                    "multibinds declaration {}.{} has an invalid type argument {}",
                    class.class_id.dotted(),
                    function.name,
                    arg.render(true)
                ));
            }
        }
        let allow_empty = function
            .annotation(&class_ids.multibinds)
            .and_then(|a| a.bool_value("allowEmpty"))
            .unwrap_or(false);
        Ok(allow_empty)
    }

    fn collect_creator(
        &self,
        annotation: &AnnotationData,
        node: &mut DependencyGraphNode,
    ) -> Result<(), FatalDiagnostic> {
        let index = self.ctx.index;
        let class_ids = &self.ctx.class_ids;
        let creator_class_id = match annotation.class_value("creator") {
            Some(creator) => creator.clone(),
            None => return Ok(()),
        };
        let creator_class = match index.class(&creator_class_id) {
            Some(class) => class,
            None => {
                return fail_at(
                    DiagnosticCode::AggregationError,
                    format!("unknown creator class {}", creator_class_id.dotted()),
                    node.location.clone(),
                )
            }
        };
        let function = match creator_class.single_abstract_function() {
            Some(function) => function.clone(),
            None => {
                return fail_at(
                    DiagnosticCode::AggregationError,
                    format!(
                        "creator {} must declare exactly one abstract function",
                        creator_class_id.dotted()
                    ),
                    creator_class.location.clone(),
                )
            }
        };
        if function.return_type.class_id.ne(&node.class_id) {
            return fail_at(
                DiagnosticCode::AggregationError,
                format!(
                    "creator {}.{} must return {}",
                    creator_class_id.dotted(),
                    function.name,
                    node.class_id.dotted()
                ),
                function.location.clone(),
            );
        }
        let mut bound_instances = Vec::new();
        let mut included_graphs = Vec::new();
        for decl in &function.parameters {
            if decl.has_annotation(&class_ids.binds_instance) {
                bound_instances.push(Parameter::from_decl(decl, index, class_ids));
                continue;
            }
            let is_graph = index
                .class(&decl.param_type.class_id)
                .map(|c| c.has_annotation(&class_ids.dependency_graph))
                .unwrap_or(false);
            if is_graph {
                node.included_graphs.push(decl.param_type.class_id.clone());
                included_graphs.push(decl.param_type.clone());
            } else {
                // Untagged creator parameters are bound instances too.
                bound_instances.push(Parameter::from_decl(decl, index, class_ids));
            }
        }
        node.creator = Some(CreatorDecl {
            class_id: creator_class_id,
            function,
            bound_instances,
            included_graphs,
        });
        Ok(())
    }

    fn merge_contributions(
        &self,
        annotation: &AnnotationData,
        node: &mut DependencyGraphNode,
    ) -> Result<(), FatalDiagnostic> {
        if node.aggregation_scopes.is_empty() {
            return Ok(());
        }
        let index = self.ctx.index;
        let class_ids = &self.ctx.class_ids;
        let excludes = annotation.class_list_value("excludes");
        let contributions = self.ctx.merger.merged_contributions(
            index,
            class_ids,
            &self.ctx.options,
            self.ctx.reporter,
            &node.aggregation_scopes,
            &excludes,
            &node.binding_containers,
        );
        for contribution in contributions {
            if contribution.is_binding(class_ids) {
                self.add_contributed_binding(&contribution, node)?;
            } else {
                // Contributed interface: its declarations merge into the
                // graph surface like any other supertype.
                let contributed_type = TypeData::new(contribution.class_id.clone());
                if !node.supertypes.contains(&contributed_type) {
                    node.supertypes.push(contributed_type);
                    if let Some(decl) = index.class(&contribution.class_id) {
                        self.collect_members(decl, node)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn add_contributed_binding(
        &self,
        contribution: &Contribution,
        node: &mut DependencyGraphNode,
    ) -> Result<(), FatalDiagnostic> {
        let index = self.ctx.index;
        let class_ids = &self.ctx.class_ids;
        let class = match index.class(&contribution.class_id) {
            Some(class) => class,
            None => return Ok(()),
        };
        if contribution.rank() != 0 && contribution.explicit_bound_type().is_none() {
            return fail_at(
                DiagnosticCode::AggregationError,
                format!(
                    "contribution {} declares a rank without an explicit bound type",
                    contribution.class_id.dotted()
                ),
                class.location.clone(),
            );
        }
        let bound_key = match self
            .ctx
            .merger
            .bound_type_key(index, class_ids, contribution)
        {
            Some(key) => key,
            None => {
                return fail_at(
                    DiagnosticCode::AggregationError,
                    format!(
                        "contribution {} has no supertype to bind; declare an explicit bound type",
                        contribution.class_id.dotted()
                    ),
                    class.location.clone(),
                )
            }
        };
        if let Some(explicit) = contribution.explicit_bound_type() {
            let bound_type = TypeData::new(explicit);
            if !index.is_subtype(&class.declared_type(), &bound_type) {
                return fail_at(
                    DiagnosticCode::AggregationError,
                    format!(
                        "contribution {} is not a subtype of its declared bound type {}",
                        contribution.class_id.dotted(),
                        bound_type.render(true)
                    ),
                    class.location.clone(),
                );
            }
        }
        node.contributed_bindings.push(ContributedBinding {
            impl_type: class.declared_type(),
            bound_key,
            rank: contribution.rank(),
            location: class.location.clone(),
        });
        Ok(())
    }
}
