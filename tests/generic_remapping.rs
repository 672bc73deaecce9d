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
use lattice::{ClassDecl, DeclarationIndex, FunctionDecl, ParameterDecl, TypeData};

fn generic_inject_class(name: &str, parameters: &[&str], deps: Vec<TypeData>) -> ClassDecl {
    let mut class = ClassDecl::new(name);
    class.type_parameters = parameters.iter().map(|p| (*p).to_owned()).collect();
    let mut constructor = FunctionDecl::new("<init>", class.declared_type());
    constructor.annotations = vec![ann("lattice/Inject")];
    constructor.parameters = deps
        .into_iter()
        .enumerate()
        .map(|(position, dep)| ParameterDecl::new(format!("p{}", position), dep))
        .collect();
    class.constructors = vec![constructor];
    class
}

// Repo<User> remaps its constructor through the call-site argument, pulling
// Store<User> rather than Store<T>.
#[test]
fn call_site_arguments_substitute_constructor_types() {
    let mut index = DeclarationIndex::new();
    index.add_class(generic_inject_class("com/example/Store", &["T"], vec![]));
    index.add_class(generic_inject_class(
        "com/example/Repo",
        &["T"],
        vec![ty_args(
            "com/example/Store",
            vec![TypeData::type_variable("T")],
        )],
    ));
    index.add_class(ClassDecl::new("com/example/User"));

    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![accessor(
        "users",
        ty_args("com/example/Repo", vec![ty("com/example/User")]),
    )];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    let repo_key = key_of(ty_args("com/example/Repo", vec![ty("com/example/User")]));
    let store_key = key_of(ty_args("com/example/Store", vec![ty("com/example/User")]));
    assert!(plan.bindings_in_topo_order.contains(&repo_key));
    assert!(plan.bindings_in_topo_order.contains(&store_key));
    // The unsubstituted form never materializes.
    assert!(!plan
        .bindings_in_topo_order
        .iter()
        .any(|k| k.render(false).contains("<T>")));
}

// Two instantiations of one generic class occupy two distinct slots.
#[test]
fn distinct_instantiations_are_distinct_slots() {
    let mut index = DeclarationIndex::new();
    index.add_class(generic_inject_class("com/example/Store", &["T"], vec![]));
    index.add_class(ClassDecl::new("com/example/User"));
    index.add_class(ClassDecl::new("com/example/Order"));

    let mut graph = graph_class("app/AppGraph");
    graph.functions = vec![
        accessor(
            "users",
            ty_args("com/example/Store", vec![ty("com/example/User")]),
        ),
        accessor(
            "orders",
            ty_args("com/example/Store", vec![ty("com/example/Order")]),
        ),
    ];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert_eq!(plan.bindings_in_topo_order.len(), 2);
}
