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

// Two @IntoMap contributions; the accessor asks for provider values. Both
// forms answer to one multibinding, planned once.
#[test]
fn map_multibinding_with_provider_values() {
    let mut index = DeclarationIndex::new();
    register_map_key(&mut index, "lattice/IntKey");

    let mut graph = graph_class("app/AppGraph");
    let mut one = provides("provide_one", ty("std/String"));
    one.annotations.push(ann("lattice/IntoMap"));
    one.annotations.push(int_key(1));
    let mut two = provides("provide_two", ty("std/String"));
    two.annotations.push(ann("lattice/IntoMap"));
    two.annotations.push(int_key(2));
    graph.functions = vec![
        accessor(
            "entries",
            map_of(ty("std/Int"), provider_of(ty("std/String"))),
        ),
        one,
        two,
    ];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    let map_key = key_of(map_of(ty("std/Int"), ty("std/String")));
    let occurrences = plan
        .bindings_in_topo_order
        .iter()
        .filter(|k| (*k).eq(&map_key))
        .count();
    assert_eq!(occurrences, 1, "multibinding planned exactly once");
    // Both contributions are first-class bindings ordered before the map.
    let map_position = plan
        .bindings_in_topo_order
        .iter()
        .position(|k| k.eq(&map_key))
        .unwrap();
    let element_positions: Vec<usize> = plan
        .bindings_in_topo_order
        .iter()
        .enumerate()
        .filter(|(_, k)| k.render(false).contains("MultibindingElement"))
        .map(|(position, _)| position)
        .collect();
    assert_eq!(element_positions.len(), 2);
    for position in element_positions {
        assert!(position < map_position);
    }
    // The accessor returns a multibinding: bit zero of the bitfield.
    assert_eq!(plan.metadata.multibinding_accessor_indices, 0b1);
    assert!(plan.deferred_types.is_empty());
}

#[test]
fn duplicate_map_keys_rejected() {
    let mut index = DeclarationIndex::new();
    register_map_key(&mut index, "lattice/IntKey");

    let mut graph = graph_class("app/AppGraph");
    let mut one = provides("provide_one", ty("std/String"));
    one.annotations.push(ann("lattice/IntoMap"));
    one.annotations.push(int_key(1));
    let mut clash = provides("provide_clash", ty("std/String"));
    clash.annotations.push(ann("lattice/IntoMap"));
    clash.annotations.push(int_key(1));
    graph.functions = vec![
        accessor("entries", map_of(ty("std/Int"), ty("std/String"))),
        one,
        clash,
    ];
    index.add_class(graph);

    let errors = resolve(&index, "app/AppGraph").unwrap_err();
    assert_eq!(errors[0].code, lattice::DiagnosticCode::AggregationError);
    assert!(errors[0].message.contains("duplicated key"));
}

#[test]
fn set_multibinding_aggregates_contributions() {
    let mut index = DeclarationIndex::new();
    let mut graph = graph_class("app/AppGraph");
    let mut one = provides("provide_one", ty("std/String"));
    one.annotations.push(ann("lattice/IntoSet"));
    let mut two = provides("provide_two", ty("std/String"));
    two.annotations.push(ann("lattice/IntoSet"));
    graph.functions = vec![accessor("strings", set_of(ty("std/String"))), one, two];
    index.add_class(graph);

    let plan = resolve(&index, "app/AppGraph").unwrap();
    assert!(plan
        .bindings_in_topo_order
        .contains(&key_of(set_of(ty("std/String")))));
    assert_eq!(plan.metadata.multibinding_accessor_indices, 0b1);
}
