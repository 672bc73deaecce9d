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
use lattice::{DeclarationIndex, DiagnosticCode};

#[test]
fn two_providers_for_one_key() {
    let mut index = DeclarationIndex::new();
    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![
        accessor("message", ty("std/String")),
        provides("provide_a", ty("std/String")),
        provides("provide_b", ty("std/String")),
    ];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, DiagnosticCode::DuplicateBinding);
    assert!(errors[0].message.contains("provide_a"));
    assert!(errors[0].message.contains("provide_b"));
}

// Same type under different qualifiers is two distinct slots, not a clash.
#[test]
fn qualifiers_disambiguate() {
    let mut index = DeclarationIndex::new();
    register_qualifier(&mut index, "com/example/Named");
    let mut graph = graph_class("app/AppGraph");
    let mut named = provides("provide_named", ty("std/String"));
    named.annotations.push(ann("com/example/Named"));
    let mut named_accessor = accessor("named_message", ty("std/String"));
    named_accessor.annotations = vec![ann("com/example/Named")];
    graph.functions = vec![
        accessor("message", ty("std/String")),
        named_accessor,
        provides("provide_plain", ty("std/String")),
        named,
    ];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert_eq!(plan.bindings_in_topo_order.len(), 2);
}

#[test]
fn overriding_a_provider_declaration_is_rejected() {
    let mut index = DeclarationIndex::new();
    let mut graph = graph_class("app/AppGraph");
    let mut overriding = provides("provide_message", ty("std/String"));
    overriding.is_override = true;
    graph.functions = vec![overriding];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors[0].code, DiagnosticCode::ProviderOverrides);
}
