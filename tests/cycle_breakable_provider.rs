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

mod common;

use common::*;
use lattice::DeclarationIndex;

// A injects Provider<B>, B injects A: the provider edge breaks the cycle.
#[test]
fn provider_edge_breaks_cycle() {
    let mut index = DeclarationIndex::new();
    index.add_class(inject_class(
        "com/example/A",
        vec![provider_of(ty("com/example/B"))],
    ));
    index.add_class(inject_class("com/example/B", vec![ty("com/example/A")]));
    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![accessor("a", ty("com/example/A"))];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert!(plan.bindings_in_topo_order.contains(&key("com/example/A")));
    assert!(plan.bindings_in_topo_order.contains(&key("com/example/B")));
    assert!(!plan.deferred_types.is_empty());
    for deferred in &plan.deferred_types {
        assert!(
            deferred.eq(&key("com/example/A")) || deferred.eq(&key("com/example/B")),
            "unexpected deferred vertex {}",
            deferred.render(false)
        );
        // The deferred vertex is reached through a provider instance.
        assert!(plan.provider_fields.contains(deferred));
    }
}

#[test]
fn lazy_edge_breaks_cycle_too() {
    let mut index = DeclarationIndex::new();
    index.add_class(inject_class(
        "com/example/A",
        vec![lazy_of(ty("com/example/B"))],
    ));
    index.add_class(inject_class("com/example/B", vec![ty("com/example/A")]));
    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![accessor("a", ty("com/example/A"))];
    index.add_class(graph);

    assert!(resolve(&index, "app/AppGraph").is_ok());
}

// The factory indirection makes the whole assisted node deferrable.
#[test]
fn assisted_factory_breaks_cycle() {
    let mut index = DeclarationIndex::new();
    // Widget <- needs Engine; Engine <- needs WidgetFactory.
    let mut widget = inject_class("com/example/Widget", vec![ty("com/example/Engine")]);
    widget.constructors[0].parameters.push({
        let mut p = lattice::ParameterDecl::new("label", ty("std/String"));
        p.annotations = vec![ann("lattice/Assisted")];
        p
    });
    index.add_class(widget);
    index.add_class(inject_class(
        "com/example/Engine",
        vec![ty("com/example/WidgetFactory")],
    ));
    let mut factory = lattice::ClassDecl::new("com/example/WidgetFactory");
    factory.kind = lattice::ClassKind::Interface;
    factory.annotations = vec![ann("lattice/AssistedFactory")];
    factory.functions = vec![{
        let mut create = accessor("create", ty("com/example/Widget"));
        create.parameters = vec![lattice::ParameterDecl::new("label", ty("std/String"))];
        create
    }];
    index.add_class(factory);

    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![accessor("engine", ty("com/example/Engine"))];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert!(plan
        .bindings_in_topo_order
        .contains(&key("com/example/WidgetFactory")));
    assert!(!plan.deferred_types.is_empty());
}
