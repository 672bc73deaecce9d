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

use crate::type_data::ClassId;
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Wrapper classes recognized as provider indirections.
    static ref PROVIDER_IDS: HashSet<String> = {
        let mut m = HashSet::<String>::new();
        m.insert("lattice/Provider".to_owned());
        m.insert("javax/inject/Provider".to_owned());
        m
    };
}

lazy_static! {
    /// Wrapper classes recognized as lazy indirections.
    static ref LAZY_IDS: HashSet<String> = {
        let mut m = HashSet::<String>::new();
        m.insert("lattice/Lazy".to_owned());
        m
    };
}

/// Well-known class ids the resolver keys decisions on. The frontend may
/// extend the wrapper sets for interop with foreign provider types.
#[derive(Debug, Clone)]
pub struct ClassIds {
    /// The framework's own provider class, used when a provider-wrapped key
    /// must be constructed.
    pub provider_id: ClassId,
    pub provider_ids: HashSet<ClassId>,
    pub lazy_ids: HashSet<ClassId>,
    pub map_id: ClassId,
    pub set_id: ClassId,
    pub members_injector_id: ClassId,
    pub unit_id: ClassId,

    pub inject: ClassId,
    pub provides: ClassId,
    pub binds: ClassId,
    pub multibinds: ClassId,
    pub into_set: ClassId,
    pub elements_into_set: ClassId,
    pub into_map: ClassId,
    pub assisted: ClassId,
    pub assisted_factory: ClassId,
    pub binds_instance: ClassId,
    pub dependency_graph: ClassId,
    pub graph_extension: ClassId,
    pub contributes_to: ClassId,
    pub contributes_binding: ClassId,
    pub binding_container: ClassId,
    pub qualifier_marker: ClassId,
    pub scope_marker: ClassId,
    pub map_key_marker: ClassId,
}

impl Default for ClassIds {
    fn default() -> Self {
        ClassIds {
            provider_id: ClassId::new("lattice/Provider"),
            provider_ids: PROVIDER_IDS.iter().map(|id| ClassId::new(id.as_str())).collect(),
            lazy_ids: LAZY_IDS.iter().map(|id| ClassId::new(id.as_str())).collect(),
            map_id: ClassId::new("std/Map"),
            set_id: ClassId::new("std/Set"),
            members_injector_id: ClassId::new("lattice/MembersInjector"),
            unit_id: ClassId::new("std/Unit"),

            inject: ClassId::new("lattice/Inject"),
            provides: ClassId::new("lattice/Provides"),
            binds: ClassId::new("lattice/Binds"),
            multibinds: ClassId::new("lattice/Multibinds"),
            into_set: ClassId::new("lattice/IntoSet"),
            elements_into_set: ClassId::new("lattice/ElementsIntoSet"),
            into_map: ClassId::new("lattice/IntoMap"),
            assisted: ClassId::new("lattice/Assisted"),
            assisted_factory: ClassId::new("lattice/AssistedFactory"),
            binds_instance: ClassId::new("lattice/BindsInstance"),
            dependency_graph: ClassId::new("lattice/DependencyGraph"),
            graph_extension: ClassId::new("lattice/GraphExtension"),
            contributes_to: ClassId::new("lattice/ContributesTo"),
            contributes_binding: ClassId::new("lattice/ContributesBinding"),
            binding_container: ClassId::new("lattice/BindingContainer"),
            qualifier_marker: ClassId::new("lattice/Qualifier"),
            scope_marker: ClassId::new("lattice/Scope"),
            map_key_marker: ClassId::new("lattice/MapKey"),
        }
    }
}

impl ClassIds {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_provider(&self, class_id: &ClassId) -> bool {
        self.provider_ids.contains(class_id)
    }

    pub fn is_lazy(&self, class_id: &ClassId) -> bool {
        self.lazy_ids.contains(class_id)
    }

    pub fn is_map(&self, class_id: &ClassId) -> bool {
        self.map_id.eq(class_id)
    }

    pub fn is_set(&self, class_id: &ClassId) -> bool {
        self.set_id.eq(class_id)
    }

    pub fn is_members_injector(&self, class_id: &ClassId) -> bool {
        self.members_injector_id.eq(class_id)
    }
}
