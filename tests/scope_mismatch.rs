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

// A @SessionScope graph may not host a @Singleton binding.
#[test]
fn scope_mismatch_is_fatal() {
    let mut index = DeclarationIndex::new();
    register_scope(&mut index, "app/SessionScope");
    register_scope(&mut index, "app/Singleton");

    let mut db = inject_class("com/example/Db", vec![]);
    db.annotations = vec![ann("app/Singleton")];
    index.add_class(db);

    let mut graph = graph_class("app/AppGraph");
    graph.annotations.push(ann("app/SessionScope"));
    graph.functions = vec![accessor("db", ty("com/example/Db"))];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, DiagnosticCode::IncompatiblyScopedBindings);
    let rendered = errors[0].to_string();
    assert!(rendered.starts_with("[Lattice/IncompatiblyScopedBindings]"));
    assert!(rendered.contains("SessionScope"));
    assert!(rendered.contains("may not reference bindings from different scopes"));
    assert!(rendered.contains("@Singleton"));
}

#[test]
fn matching_scope_is_accepted_and_memoized() {
    let mut index = DeclarationIndex::new();
    register_scope(&mut index, "app/Singleton");

    let mut db = inject_class("com/example/Db", vec![]);
    db.annotations = vec![ann("app/Singleton")];
    index.add_class(db);

    let mut graph = graph_class("app/AppGraph");
    graph.annotations.push(ann("app/Singleton"));
    graph.functions = vec![accessor("db", ty("com/example/Db"))];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    // Scoped bindings always get a provider field.
    assert!(plan.provider_fields.contains(&key("com/example/Db")));
}

#[test]
fn unscoped_binding_referenced_twice_gets_field() {
    let mut index = DeclarationIndex::new();
    index.add_class(inject_class("com/example/Repo", vec![]));
    index.add_class(inject_class(
        "com/example/UserService",
        vec![ty("com/example/Repo")],
    ));
    index.add_class(inject_class(
        "com/example/AdminService",
        vec![ty("com/example/Repo")],
    ));
    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![
        accessor("users", ty("com/example/UserService")),
        accessor("admins", ty("com/example/AdminService")),
    ];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert!(plan.provider_fields.contains(&key("com/example/Repo")));
    assert!(!plan.provider_fields.contains(&key("com/example/UserService")));
}
