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
use lattice::{ClassKind, DeclarationIndex, FunctionDecl, ParameterDecl};

fn creator_class(graph: &str, parameters: Vec<ParameterDecl>) -> lattice::ClassDecl {
    let mut factory = lattice::ClassDecl::new("app/AppGraphFactory");
    factory.kind = ClassKind::Interface;
    let mut create = FunctionDecl::new("create", ty(graph));
    create.is_abstract = true;
    create.parameters = parameters;
    factory.functions = vec![create];
    factory
}

#[test]
fn bound_instance_becomes_instance_field() {
    let mut index = DeclarationIndex::new();
    let mut config_parameter = ParameterDecl::new("config", ty("com/example/Config"));
    config_parameter.annotations = vec![ann("lattice/BindsInstance")];
    index.add_class(creator_class("app/AppGraph", vec![config_parameter]));

    let mut graph = graph_class("app/AppGraph");
    graph.annotations = vec![
        ann("lattice/DependencyGraph").with_arg("creator", class_ref("app/AppGraphFactory")),
    ];
    graph.functions = vec![accessor("config", ty("com/example/Config"))];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert_eq!(plan.instance_fields, vec!["config"]);
    assert_eq!(
        plan.bindings_in_topo_order,
        vec![key("com/example/Config")]
    );
}

// A creator parameter that is itself a graph includes that graph's
// accessors as bindings here.
#[test]
fn included_graph_exposes_accessors() {
    let mut index = DeclarationIndex::new();
    let mut network_graph = graph_class("net/NetworkGraph");
    network_graph.functions = vec![
        accessor("client", ty("net/HttpClient")),
        provides("provide_client", ty("net/HttpClient")),
    ];
    index.add_class(network_graph);

    index.add_class(creator_class(
        "app/AppGraph",
        vec![ParameterDecl::new("network", ty("net/NetworkGraph"))],
    ));
    index.add_class(inject_class(
        "com/example/Api",
        vec![ty("net/HttpClient")],
    ));

    let mut graph = graph_class("app/AppGraph");
    graph.annotations = vec![
        ann("lattice/DependencyGraph").with_arg("creator", class_ref("app/AppGraphFactory")),
    ];
    graph.functions = vec![accessor("api", ty("com/example/Api"))];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert!(plan.bindings_in_topo_order.contains(&key("net/HttpClient")));
    assert!(plan.bindings_in_topo_order.contains(&key("com/example/Api")));
    // Values reached through another graph are memoized locally.
    assert!(plan.provider_fields.contains(&key("net/HttpClient")));
}

#[test]
fn creator_must_return_the_graph() {
    let mut index = DeclarationIndex::new();
    index.add_class(creator_class("app/OtherGraph", vec![]));
    let mut graph = graph_class("app/AppGraph");
    graph.annotations = vec![
        ann("lattice/DependencyGraph").with_arg("creator", class_ref("app/AppGraphFactory")),
    ];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors[0].code, lattice::DiagnosticCode::AggregationError);
    assert!(errors[0].message.contains("must return"));
}
