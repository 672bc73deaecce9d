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

//! Top-level driver: discovery, seeding, validation, planning, metadata.

use crate::annotation::{AnnotationData, AnnotationValue};
use crate::bindings::{
    AliasBinding, Binding, BoundInstanceBinding, GraphDependencyBinding, GraphExtensionBinding,
    GraphExtensionFactoryBinding, MultibindingSource, ProvidedBinding,
};
use crate::class_ids::ClassIds;
use crate::contributions::ContributionMerger;
use crate::declarations::DeclarationIndex;
use crate::diagnostics::{
    fail_at, DiagnosticCode, DiagnosticReporter, FatalDiagnostic,
};
use crate::graph::BindingGraph;
use crate::graph_node::{DependencyGraphNode, GraphNodeBuilder, ProviderFactory};
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::metadata::GraphMetadata;
use crate::parameters::Parameters;
use crate::parent::ParentContext;
use crate::planner::plan_provider_fields;
use crate::stack::BindingStack;
use crate::type_data::{ClassId, TypeData};
use crate::validator::{injector_request_key, Validator};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::{debug, debug_span};

/// Records classpath references for incremental compilation.
pub trait LookupTracker {
    fn record_class(&self, class_id: &ClassId);
    fn record_function(&self, owner: &ClassId, name: &str);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Honor contribution ranks when merging.
    pub rank_interop_enabled: bool,
    /// Report excludes/replaces that matched nothing.
    pub warn_on_unmatched_removals: bool,
    pub max_similarity_hints: usize,
    /// Rows of binding stack rendered before eliding.
    pub stack_render_limit: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            rank_interop_enabled: true,
            warn_on_unmatched_removals: false,
            max_similarity_hints: 5,
            stack_render_limit: 16,
        }
    }
}

/// Long-lived state for one compilation unit, threaded by shared reference
/// through every component.
pub struct ResolverContext<'a> {
    pub index: &'a DeclarationIndex,
    pub class_ids: ClassIds,
    pub options: ResolverOptions,
    pub reporter: &'a dyn DiagnosticReporter,
    pub tracker: Option<&'a dyn LookupTracker>,
    pub merger: ContributionMerger,
    pub node_registry: RefCell<BTreeMap<ClassId, Rc<DependencyGraphNode>>>,
}

/// The emitter's input for one resolved graph.
#[derive(Debug, Clone)]
pub struct ResolvedGraphPlan {
    pub graph_class: ClassId,
    pub node_key: TypeKey,
    pub bindings_in_topo_order: Vec<TypeKey>,
    pub deferred_types: Vec<TypeKey>,
    pub provider_fields: Vec<TypeKey>,
    /// Creator-supplied instance fields, in creator parameter order.
    pub instance_fields: Vec<String>,
    pub metadata: GraphMetadata,
    /// Child graph plans, resolved against this graph as parent.
    pub extensions: Vec<ResolvedGraphPlan>,
}

pub struct Resolver<'a> {
    ctx: ResolverContext<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a DeclarationIndex, reporter: &'a dyn DiagnosticReporter) -> Self {
        Resolver {
            ctx: ResolverContext {
                index,
                class_ids: ClassIds::default(),
                options: ResolverOptions::default(),
                reporter,
                tracker: None,
                merger: ContributionMerger::new(),
                node_registry: RefCell::new(BTreeMap::new()),
            },
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.ctx.options = options;
        self
    }

    pub fn with_class_ids(mut self, class_ids: ClassIds) -> Self {
        self.ctx.class_ids = class_ids;
        self
    }

    pub fn with_tracker(mut self, tracker: &'a dyn LookupTracker) -> Self {
        self.ctx.tracker = Some(tracker);
        self
    }

    pub fn context(&self) -> &ResolverContext<'a> {
        &self.ctx
    }

    /// Resolves one graph class into a plan. A failure is reported and
    /// returned; other graphs are unaffected.
    pub fn resolve(&self, graph_class: &ClassId) -> Result<ResolvedGraphPlan, FatalDiagnostic> {
        let span = debug_span!("resolve_graph", graph = %graph_class.dotted());
        let _entered = span.enter();
        match self.resolve_node(graph_class, Vec::new(), ParentContext::new()) {
            Ok((plan, _)) => Ok(plan),
            Err(fatal) => {
                self.ctx.reporter.error(&fatal.0);
                Err(fatal)
            }
        }
    }

    /// Resolves every top-level graph in the index; failures are reported
    /// per graph and resolution continues with the rest.
    pub fn resolve_all(&self) -> Vec<ResolvedGraphPlan> {
        let graph_classes: Vec<ClassId> = self
            .ctx
            .index
            .classes()
            .filter(|class| class.has_annotation(&self.ctx.class_ids.dependency_graph))
            .map(|class| class.class_id.clone())
            .collect();
        let mut plans = Vec::new();
        for graph_class in graph_classes {
            if let Ok(plan) = self.resolve(&graph_class) {
                plans.push(plan);
            }
        }
        plans
    }

    fn resolve_node(
        &self,
        graph_class: &ClassId,
        extended: Vec<ClassId>,
        parent_ctx: ParentContext,
    ) -> Result<(ResolvedGraphPlan, ParentContext), FatalDiagnostic> {
        let node = Rc::new(GraphNodeBuilder::new(&self.ctx).build(graph_class, extended)?);
        self.ctx
            .node_registry
            .borrow_mut()
            .insert(graph_class.clone(), node.clone());

        let mut stack = BindingStack::new(node.graph_name());
        let mut graph = BindingGraph::new(&self.ctx, node.clone(), parent_ctx);
        self.seed_graph(&mut graph, &mut stack)?;

        let validated = {
            let registry = self.ctx.node_registry.borrow();
            Validator::new(&self.ctx, &registry).validate(&mut graph, &mut stack)?
        };

        // Children resolve before planning so the keys they reach through
        // this graph keep their provider fields.
        let mut externally_used: BTreeSet<TypeKey> = BTreeSet::new();
        let mut extensions = Vec::new();
        for extension_class in node.graph_extensions.clone() {
            let mut child_parent = std::mem::take(graph.parent_mut());
            child_parent.add_all(
                graph
                    .bindings_snapshot()
                    .into_iter()
                    .map(|(key, _)| key)
                    .filter(|key| !graph.is_twin_key(key)),
            );
            child_parent.push_parent_graph(node.type_key.clone(), node.scopes.clone());
            let mut child_extended = vec![node.class_id.clone()];
            child_extended.extend(node.extended_graphs.iter().cloned());
            let (child_plan, mut returned) =
                self.resolve_node(&extension_class, child_extended, child_parent)?;
            externally_used.extend(returned.used_keys());
            returned.pop_parent_graph();
            *graph.parent_mut() = returned;
            extensions.push(child_plan);
        }

        let provider_fields = plan_provider_fields(
            &graph,
            &validated.reference_counts,
            &validated.deferred_types,
            &externally_used,
        );
        let instance_fields: Vec<String> = node
            .creator
            .as_ref()
            .map(|creator| {
                creator
                    .bound_instances
                    .iter()
                    .map(|parameter| parameter.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        let metadata = self.compute_metadata(&graph);
        node.attach_proto(metadata.clone());

        debug!(
            graph = %node.graph_name(),
            bindings = validated.sorted_keys.len(),
            provider_fields = provider_fields.len(),
            "resolved graph"
        );
        let plan = ResolvedGraphPlan {
            graph_class: node.class_id.clone(),
            node_key: node.type_key.clone(),
            bindings_in_topo_order: validated.sorted_keys,
            deferred_types: validated.deferred_types,
            provider_fields,
            instance_fields,
            metadata,
            extensions,
        };
        Ok((plan, graph.into_parent()))
    }

    // ---------------------------------------------------------------------
    // Seeding
    // ---------------------------------------------------------------------

    fn seed_graph(
        &self,
        graph: &mut BindingGraph<'_>,
        stack: &mut BindingStack,
    ) -> Result<(), FatalDiagnostic> {
        let node = graph.node().clone();
        let class_ids = &self.ctx.class_ids;
        let index = self.ctx.index;

        // Creator-supplied instances.
        if let Some(creator) = &node.creator {
            for parameter in &creator.bound_instances {
                graph.add_binding(
                    Rc::new(BoundInstanceBinding {
                        contextual_key: parameter.contextual_key.clone(),
                        name: parameter.name.clone(),
                        location: parameter.location.clone(),
                    }),
                    stack,
                )?;
            }
        }

        // Included graphs, transitively, expose their accessors here.
        let mut include_queue = node.included_graphs.clone();
        let mut seen_includes = BTreeSet::new();
        while let Some(included) = include_queue.pop() {
            if !seen_includes.insert(included.clone()) {
                continue;
            }
            let included_node = self.node_for(&included)?;
            include_queue.extend(included_node.included_graphs.iter().cloned());
        }
        let all_included = {
            let registry = self.ctx.node_registry.borrow();
            node.all_included_nodes(&registry)
        };
        for included in all_included {
            let included_node = self.node_for(&included)?;
            for accessor in &included_node.accessors {
                graph.add_binding(
                    Rc::new(GraphDependencyBinding {
                        contextual_key: accessor.contextual_key.clone(),
                        owner_key: included_node.type_key.clone(),
                        getter: accessor.name.clone(),
                        is_provider_field_accessor: false,
                        location: accessor.location.clone(),
                    }),
                    stack,
                )?;
            }
        }

        // Multibinds declarations first, so allow-empty settings are in
        // place before contributions attach.
        for multibinds in &node.multibinds_callables {
            let return_type = &multibinds.function.return_type;
            let qualifier = index.qualifier_annotation(&multibinds.function.annotations, class_ids);
            let key = ContextualTypeKey::from_type(return_type, qualifier, false, class_ids);
            let is_map = class_ids.is_map(&return_type.class_id);
            graph.get_or_create_multibinding(&key, is_map, multibinds.allow_empty, stack)?;
        }

        for factory in node.provider_factories.clone() {
            self.seed_provider(graph, &factory, stack)?;
        }

        for binds in node.binds_callables.clone() {
            self.seed_binds(graph, &binds.owner, &binds.function, stack)?;
        }

        for contributed in &node.contributed_bindings {
            let impl_key = ContextualTypeKey::from_type(&contributed.impl_type, None, false, class_ids);
            let bound_ctx = ContextualTypeKey::from_type_key(contributed.bound_key.clone());
            let mut alias = AliasBinding::new(
                bound_ctx,
                impl_key,
                contributed.impl_type.class_id.clone(),
                "contribution".to_owned(),
            );
            alias.location = contributed.location.clone();
            graph.add_binding(Rc::new(alias), stack)?;
        }

        // Injector functions inject members of externally built instances.
        for injector in &node.injectors {
            let key = injector_request_key(&self.ctx, &injector.target);
            let binding = graph.lookup().members_injected(
                key,
                injector.target.type_key().type_data(),
                true,
                &injector.name,
            );
            if let Some(binding) = binding {
                graph.add_binding(binding, stack)?;
            }
        }

        // Extension instantiation points.
        for accessor in &node.accessors {
            let returned = accessor.contextual_key.type_key().class_id().clone();
            if node.graph_extensions.contains(&returned) {
                graph.add_binding(
                    Rc::new(GraphExtensionBinding {
                        contextual_key: accessor.contextual_key.clone(),
                        extension_class: returned,
                        parent_key: node.type_key.clone(),
                        location: accessor.location.clone(),
                    }),
                    stack,
                )?;
                continue;
            }
            if let Some(extension_class) = self.extension_created_by(&returned) {
                graph.add_binding(
                    Rc::new(GraphExtensionFactoryBinding {
                        contextual_key: accessor.contextual_key.clone(),
                        factory_class: returned,
                        extension_key: TypeKey::simple(TypeData::new(extension_class)),
                        parent_key: node.type_key.clone(),
                        location: accessor.location.clone(),
                    }),
                    stack,
                )?;
            }
        }
        Ok(())
    }

    fn seed_provider(
        &self,
        graph: &mut BindingGraph<'_>,
        factory: &ProviderFactory,
        stack: &mut BindingStack,
    ) -> Result<(), FatalDiagnostic> {
        let class_ids = &self.ctx.class_ids;
        let index = self.ctx.index;
        let function = &factory.function;
        let qualifier = index.qualifier_annotation(&function.annotations, class_ids);
        let scope = index.scope_annotation(&function.annotations, class_ids);
        let into_set = function.has_annotation(&class_ids.into_set);
        let elements_into_set = function.has_annotation(&class_ids.elements_into_set);
        let into_map = function.has_annotation(&class_ids.into_map);
        let map_key = index.map_key_annotation(&function.annotations, class_ids);
        let parameters = Parameters::from_function(function, index, class_ids);

        let make_binding = |contextual_key: ContextualTypeKey| ProvidedBinding {
            contextual_key,
            provider_factory: factory.clone(),
            parameters: parameters.clone(),
            scope: scope.clone(),
            annotations: function.annotations.clone(),
            aliased_type: None,
            into_set,
            elements_into_set,
            into_map,
            map_key: map_key.clone(),
            location: function.location.clone(),
        };

        if !(into_set || elements_into_set || into_map) {
            let key = ContextualTypeKey::from_type(&function.return_type, qualifier, false, class_ids);
            return graph.add_binding(Rc::new(make_binding(key)), stack);
        }

        let collection_key = if into_map {
            let map_key = match &map_key {
                Some(map_key) => map_key.clone(),
                None => {
                    return fail_at(
                        DiagnosticCode::ProvidesError,
                        format!(
                            "map contribution {}.{} has no map key annotation",
                            factory.owner.dotted(),
                            function.name
                        ),
                        function.location.clone(),
                    )
                }
            };
            let map_type = TypeData::with_args(
                class_ids.map_id.clone(),
                vec![map_key_type(&map_key), function.return_type.clone()],
            );
            ContextualTypeKey::from_type(&map_type, qualifier.clone(), false, class_ids)
        } else if elements_into_set {
            ContextualTypeKey::from_type(&function.return_type, qualifier.clone(), false, class_ids)
        } else {
            let set_type =
                TypeData::with_args(class_ids.set_id.clone(), vec![function.return_type.clone()]);
            ContextualTypeKey::from_type(&set_type, qualifier.clone(), false, class_ids)
        };

        // Merging map entries into a parent graph's multibinding is not
        // supported; flag it rather than silently dropping entries.
        if into_map && graph.parent().contains(collection_key.type_key()) {
            return fail_at(
                DiagnosticCode::AggregationError,
                format!(
                    "{}.{} contributes to map multibinding {}, which belongs to a parent graph; \
                     merging entries across graph extensions is not supported",
                    factory.owner.dotted(),
                    function.name,
                    collection_key.type_key().render(false)
                ),
                function.location.clone(),
            );
        }

        let multibinding =
            graph.get_or_create_multibinding(&collection_key, into_map, false, stack)?;
        let element_key = ContextualTypeKey::from_type(
            &function.return_type,
            Some(element_annotation(&factory.owner, &function.name, qualifier.as_ref())),
            false,
            class_ids,
        );
        let binding = make_binding(element_key.clone());
        let source = MultibindingSource {
            type_key: element_key.type_key().clone(),
            contextual_key: element_key,
            name_hint: binding.name_hint(),
            scope_render: scope.as_ref().map(AnnotationData::render).unwrap_or_default(),
            parameters_render: parameters.render(),
            map_key: map_key.clone(),
            is_elements: elements_into_set,
        };
        graph.add_binding(Rc::new(binding), stack)?;
        multibinding.add_source(source)?;
        Ok(())
    }

    fn seed_binds(
        &self,
        graph: &mut BindingGraph<'_>,
        owner: &ClassId,
        function: &crate::declarations::FunctionDecl,
        stack: &mut BindingStack,
    ) -> Result<(), FatalDiagnostic> {
        let class_ids = &self.ctx.class_ids;
        let index = self.ctx.index;
        let qualifier = index.qualifier_annotation(&function.annotations, class_ids);
        let source_parameter = &function.parameters[0];
        let source_qualifier = index.qualifier_annotation(&source_parameter.annotations, class_ids);
        let aliased = ContextualTypeKey::from_type(
            &source_parameter.param_type,
            source_qualifier,
            false,
            class_ids,
        );
        let into_set = function.has_annotation(&class_ids.into_set);
        let elements_into_set = function.has_annotation(&class_ids.elements_into_set);
        let into_map = function.has_annotation(&class_ids.into_map);
        let map_key = index.map_key_annotation(&function.annotations, class_ids);

        if !(into_set || elements_into_set || into_map) {
            let key = ContextualTypeKey::from_type(&function.return_type, qualifier, false, class_ids);
            let mut alias = AliasBinding::new(key, aliased, owner.clone(), function.name.clone());
            alias.location = function.location.clone();
            graph.add_binding(Rc::new(alias), stack)?;
            return Ok(());
        }

        let collection_key = if into_map {
            let map_key_annotation = match &map_key {
                Some(found) => found.clone(),
                None => {
                    return fail_at(
                        DiagnosticCode::BindsError,
                        format!(
                            "map contribution {}.{} has no map key annotation",
                            owner.dotted(),
                            function.name
                        ),
                        function.location.clone(),
                    )
                }
            };
            let map_type = TypeData::with_args(
                class_ids.map_id.clone(),
                vec![map_key_type(&map_key_annotation), function.return_type.clone()],
            );
            ContextualTypeKey::from_type(&map_type, qualifier.clone(), false, class_ids)
        } else if elements_into_set {
            ContextualTypeKey::from_type(&function.return_type, qualifier.clone(), false, class_ids)
        } else {
            let set_type =
                TypeData::with_args(class_ids.set_id.clone(), vec![function.return_type.clone()]);
            ContextualTypeKey::from_type(&set_type, qualifier.clone(), false, class_ids)
        };
        if into_map && graph.parent().contains(collection_key.type_key()) {
            return fail_at(
                DiagnosticCode::AggregationError,
                format!(
                    "{}.{} contributes to map multibinding {}, which belongs to a parent graph; \
                     merging entries across graph extensions is not supported",
                    owner.dotted(),
                    function.name,
                    collection_key.type_key().render(false)
                ),
                function.location.clone(),
            );
        }
        let multibinding =
            graph.get_or_create_multibinding(&collection_key, into_map, false, stack)?;
        let element_key = ContextualTypeKey::from_type(
            &function.return_type,
            Some(element_annotation(owner, &function.name, qualifier.as_ref())),
            false,
            class_ids,
        );
        let mut alias = AliasBinding::new(
            element_key.clone(),
            aliased,
            owner.clone(),
            function.name.clone(),
        );
        alias.into_set = into_set;
        alias.elements_into_set = elements_into_set;
        alias.into_map = into_map;
        alias.map_key = map_key.clone();
        alias.location = function.location.clone();
        let source = MultibindingSource {
            type_key: element_key.type_key().clone(),
            contextual_key: element_key,
            name_hint: alias.name_hint(),
            scope_render: String::new(),
            parameters_render: String::new(),
            map_key,
            is_elements: elements_into_set,
        };
        graph.add_binding(Rc::new(alias), stack)?;
        multibinding.add_source(source)?;
        Ok(())
    }

    /// Node for an included graph: discovery only, no resolution.
    fn node_for(&self, graph_class: &ClassId) -> Result<Rc<DependencyGraphNode>, FatalDiagnostic> {
        if let Some(found) = self.ctx.node_registry.borrow().get(graph_class) {
            return Ok(found.clone());
        }
        let node = Rc::new(GraphNodeBuilder::new(&self.ctx).build(graph_class, Vec::new())?);
        self.ctx
            .node_registry
            .borrow_mut()
            .insert(graph_class.clone(), node.clone());
        Ok(node)
    }

    /// The extension class whose creator is `factory_class`, if any.
    fn extension_created_by(&self, factory_class: &ClassId) -> Option<ClassId> {
        for class in self.ctx.index.classes() {
            if let Some(annotation) = class.annotation(&self.ctx.class_ids.graph_extension) {
                if annotation.class_value("creator") == Some(factory_class) {
                    return Some(class.class_id.clone());
                }
            }
        }
        None
    }

    fn compute_metadata(&self, graph: &BindingGraph<'_>) -> GraphMetadata {
        let node = graph.node();
        let mut accessor_names: Vec<(String, TypeKey)> = node
            .accessors
            .iter()
            .map(|accessor| {
                (
                    accessor.name.clone(),
                    accessor.contextual_key.type_key().clone(),
                )
            })
            .collect();
        accessor_names.sort_by(|a, b| a.0.cmp(&b.0));
        let mut multibinding_accessor_indices: i64 = 0;
        for (index, (_, key)) in accessor_names.iter().enumerate() {
            if graph.find_multibinding(key).is_some() && index < 64 {
                multibinding_accessor_indices |= 1 << index;
            }
        }
        GraphMetadata {
            is_graph: true,
            provider_factory_classes: node
                .provider_factories
                .iter()
                .map(|factory| factory.owner.dotted())
                .collect(),
            accessor_callable_names: accessor_names.into_iter().map(|(name, _)| name).collect(),
            multibinding_accessor_indices,
            included_binding_containers: node
                .binding_containers
                .iter()
                .map(ClassId::dotted)
                .collect(),
        }
        .normalized()
    }
}

/// Synthetic qualifier that gives each multibinding contribution its own
/// slot in the graph.
fn element_annotation(
    owner: &ClassId,
    callable: &str,
    qualifier: Option<&AnnotationData>,
) -> AnnotationData {
    let mut annotation = AnnotationData::new("lattice/internal/MultibindingElement")
        .with_arg("owner", AnnotationValue::Str(owner.as_str().to_owned()))
        .with_arg("callable", AnnotationValue::Str(callable.to_owned()));
    if let Some(qualifier) = qualifier {
        annotation = annotation.with_arg(
            "qualifier",
            AnnotationValue::Annotation(qualifier.clone()),
        );
    }
    annotation
}

/// The key type a map-key annotation implies.
fn map_key_type(annotation: &AnnotationData) -> TypeData {
    let value = annotation
        .args
        .get("value")
        .or_else(|| annotation.args.values().next());
    match value {
        Some(AnnotationValue::Str(_)) => TypeData::new("std/String"),
        Some(AnnotationValue::Int(_)) => TypeData::new("std/Int"),
        Some(AnnotationValue::Bool(_)) => TypeData::new("std/Boolean"),
        Some(AnnotationValue::EnumEntry(class_id, _)) => TypeData::new(class_id.clone()),
        Some(AnnotationValue::ClassRef(_)) => TypeData::new("std/KClass"),
        _ => TypeData::new("std/String"),
    }
}
