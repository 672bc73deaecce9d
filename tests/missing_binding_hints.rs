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
fn missing_binding_reports_request_chain() {
    let mut index = DeclarationIndex::new();
    index.add_class(inject_class(
        "com/example/Service",
        vec![ty("com/example/Repo")],
    ));
    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![accessor("service", ty("com/example/Service"))];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, DiagnosticCode::MissingBinding);
    let rendered = errors[0].to_string();
    assert!(rendered.contains("com.example.Repo"));
    assert!(rendered.contains("(in graph app.AppGraph)"));
}

#[test]
fn different_qualifier_hint() {
    let mut index = DeclarationIndex::new();
    register_qualifier(&mut index, "com/example/Named");
    let mut graph = graph_class("app/AppGraph");
    let mut named = provides("provide_named", ty("std/String"));
    named.annotations.push(ann("com/example/Named"));
    graph.functions = vec![accessor("message", ty("std/String")), named];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors[0].code, DiagnosticCode::MissingBinding);
    assert!(errors[0].message.contains("Similar bindings"));
    assert!(errors[0].message.contains("Different qualifier"));
}

#[test]
fn subtype_hint_for_unbound_interface() {
    let mut index = DeclarationIndex::new();
    let mut api = lattice::ClassDecl::new("com/example/Api");
    api.kind = lattice::ClassKind::Interface;
    index.add_class(api);
    let mut impl_class = inject_class("com/example/ApiImpl", vec![]);
    impl_class.supertypes = vec![ty("com/example/Api")];
    index.add_class(impl_class);

    let mut graph = graph_class("app/AppGraph");
    // The impl accessor resolves first, so the impl binding exists by the
    // time the interface request fails.
    graph.functions = vec![
        accessor("impl", ty("com/example/ApiImpl")),
        accessor("api", ty("com/example/Api")),
    ];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors[0].code, DiagnosticCode::MissingBinding);
    assert!(errors[0].message.contains("Subtype: ApiImpl"));
}

// A defaulted parameter with no binding is simply omitted, not an error.
#[test]
fn defaulted_parameter_resolves_absent() {
    let mut index = DeclarationIndex::new();
    let mut service = inject_class("com/example/Service", vec![]);
    let mut defaulted = lattice::ParameterDecl::new("flags", ty("com/example/Flags"));
    defaulted.has_default = true;
    service.constructors[0].parameters.push(defaulted);
    index.add_class(service);

    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![accessor("service", ty("com/example/Service"))];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert!(plan
        .bindings_in_topo_order
        .contains(&key("com/example/Service")));
    assert!(!plan
        .bindings_in_topo_order
        .contains(&key("com/example/Flags")));
}
