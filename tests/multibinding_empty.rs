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
use lattice::{AnnotationValue, DeclarationIndex, DiagnosticCode, FunctionDecl};

fn multibinds(name: &str, return_type: lattice::TypeData, allow_empty: bool) -> FunctionDecl {
    let mut function = FunctionDecl::new(name, return_type);
    function.is_abstract = true;
    function.annotations = vec![
        ann("lattice/Multibinds").with_arg("allowEmpty", AnnotationValue::Bool(allow_empty)),
    ];
    function
}

// An allow-empty declaration resolves to an empty terminal collection.
#[test]
fn empty_set_allowed_when_declared() {
    let mut index = DeclarationIndex::new();
    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![
        multibinds("strings", set_of(ty("std/String")), true),
        accessor("all_strings", set_of(ty("std/String"))),
    ];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert!(plan
        .bindings_in_topo_order
        .contains(&key_of(set_of(ty("std/String")))));
    assert!(plan.deferred_types.is_empty());
}

#[test]
fn empty_set_rejected_without_allow_empty() {
    let mut index = DeclarationIndex::new();
    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![
        multibinds("strings", set_of(ty("std/String")), false),
        accessor("all_strings", set_of(ty("std/String"))),
    ];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors[0].code, DiagnosticCode::MissingBinding);
    assert!(errors[0].message.contains("no contributions"));
}

#[test]
fn scoped_multibinds_declaration_rejected() {
    let mut index = DeclarationIndex::new();
    register_scope(&mut index, "app/Singleton");
    let mut graph = graph_class("app/AppGraph");
    let mut declaration = multibinds("strings", set_of(ty("std/String")), true);
    declaration.annotations.push(ann("app/Singleton"));
    graph.functions = vec![declaration];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors[0].code, DiagnosticCode::MultibindsError);
}

#[test]
fn non_collection_multibinds_declaration_rejected() {
    let mut index = DeclarationIndex::new();
    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![multibinds("broken", ty("std/String"), true)];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors[0].code, DiagnosticCode::MultibindsError);
    assert!(errors[0].message.contains("Set or a Map"));
}
