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

use crate::annotation::AnnotationData;
use crate::bindings::Binding;
use crate::diagnostics::{fail_at, DiagnosticCode, FatalDiagnostic, Location};
use crate::keys::{ContextualTypeKey, TypeKey};
use std::any::Any;
use std::cell::RefCell;

/// One contribution aggregated into a multibinding, with the tuple the
/// source ordering is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultibindingSource {
    /// The (synthetic) key the contribution is registered under in the graph.
    pub type_key: TypeKey,
    pub contextual_key: ContextualTypeKey,
    pub name_hint: String,
    pub scope_render: String,
    pub parameters_render: String,
    /// Map contributions carry their key annotation.
    pub map_key: Option<AnnotationData>,
    /// An elements-into-set contribution supplies a whole collection.
    pub is_elements: bool,
}

impl MultibindingSource {
    fn sort_key(&self) -> (String, String, String, String) {
        (
            self.type_key.render(false),
            self.name_hint.clone(),
            self.scope_render.clone(),
            self.parameters_render.clone(),
        )
    }
}

/// An aggregated Set or Map assembled from contributions. Shared between the
/// canonical key and, for maps, the provider-valued key.
#[derive(Debug)]
pub struct MultibindingBinding {
    pub contextual_key: ContextualTypeKey,
    pub is_map: bool,
    /// Declared by an explicit multibinds callable allowing an empty
    /// aggregate.
    pub allow_empty: bool,
    pub declaration_location: Option<Location>,
    sources: RefCell<Vec<MultibindingSource>>,
}

impl MultibindingBinding {
    pub fn new(
        contextual_key: ContextualTypeKey,
        is_map: bool,
        allow_empty: bool,
        declaration_location: Option<Location>,
    ) -> Self {
        MultibindingBinding {
            contextual_key,
            is_map,
            allow_empty,
            declaration_location,
            sources: RefCell::new(Vec::new()),
        }
    }

    pub fn set_allow_empty(&mut self, allow_empty: bool) {
        self.allow_empty = allow_empty;
    }

    /// Inserts a contribution keeping `(typeKey, nameHint, scope,
    /// parameters)` order. Duplicate map keys are a hard error.
    pub fn add_source(&self, source: MultibindingSource) -> Result<(), FatalDiagnostic> {
        let mut sources = self.sources.borrow_mut();
        if self.is_map {
            if let Some(map_key) = &source.map_key {
                let clash = sources
                    .iter()
                    .find(|existing| existing.map_key.as_ref() == Some(map_key));
                if let Some(clash) = clash {
                    return fail_at(
                        DiagnosticCode::AggregationError,
                        format!(
                            "found duplicated key {} for {}, provided by:\n\t{}\n\t{}",
                            map_key.render(),
                            self.contextual_key.type_key().render(false),
                            clash.name_hint,
                            source.name_hint
                        ),
                        self.declaration_location.clone(),
                    );
                }
            }
        }
        let position = sources
            .binary_search_by_key(&source.sort_key(), MultibindingSource::sort_key)
            .unwrap_or_else(|insertion| insertion);
        sources.insert(position, source);
        Ok(())
    }

    pub fn sources(&self) -> Vec<MultibindingSource> {
        self.sources.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.borrow().len()
    }
}

impl Binding for MultibindingBinding {
    fn type_key(&self) -> &TypeKey {
        self.contextual_key.type_key()
    }

    fn contextual_type_key(&self) -> &ContextualTypeKey {
        &self.contextual_key
    }

    fn name_hint(&self) -> String {
        format!(
            "{} (multibinding)",
            self.contextual_key.type_key().render(true)
        )
    }

    fn dependencies(&self) -> Vec<ContextualTypeKey> {
        self.sources
            .borrow()
            .iter()
            .map(|source| source.contextual_key.clone())
            .collect()
    }

    fn location(&self) -> Option<&Location> {
        self.declaration_location.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationValue;
    use crate::class_ids::ClassIds;
    use crate::type_data::TypeData;

    fn set_of_string() -> ContextualTypeKey {
        ContextualTypeKey::from_type(
            &TypeData::with_args("std/Set", vec![TypeData::new("std/String")]),
            None,
            false,
            &ClassIds::default(),
        )
    }

    fn source(name: &str) -> MultibindingSource {
        let key = ContextualTypeKey::from_type(
            &TypeData::new(format!("com/example/{}", name).as_str()),
            None,
            false,
            &ClassIds::default(),
        );
        MultibindingSource {
            type_key: key.type_key().clone(),
            contextual_key: key,
            name_hint: name.to_owned(),
            scope_render: String::new(),
            parameters_render: String::new(),
            map_key: None,
            is_elements: false,
        }
    }

    #[test]
    fn sources_stay_sorted_regardless_of_insertion_order() {
        let multibinding = MultibindingBinding::new(set_of_string(), false, false, None);
        multibinding.add_source(source("Zeta")).unwrap();
        multibinding.add_source(source("Alpha")).unwrap();
        multibinding.add_source(source("Mid")).unwrap();
        let names: Vec<String> = multibinding
            .sources()
            .iter()
            .map(|s| s.name_hint.clone())
            .collect();
        assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn duplicate_map_key_rejected() {
        let map_key_type = TypeData::with_args(
            "std/Map",
            vec![TypeData::new("std/Int"), TypeData::new("std/String")],
        );
        let contextual =
            ContextualTypeKey::from_type(&map_key_type, None, false, &ClassIds::default());
        let multibinding = MultibindingBinding::new(contextual, true, false, None);
        let annotation = AnnotationData::new("lattice/IntKey")
            .with_arg("value", AnnotationValue::Int(1));
        let mut first = source("One");
        first.map_key = Some(annotation.clone());
        let mut second = source("Two");
        second.map_key = Some(annotation);
        multibinding.add_source(first).unwrap();
        let error = multibinding.add_source(second).unwrap_err();
        assert_eq!(error.0.code, DiagnosticCode::AggregationError);
    }
}
