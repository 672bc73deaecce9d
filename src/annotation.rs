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

use crate::type_data::{ClassId, TypeData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An annotation value tree with structural equality.
///
/// Arguments live in a sorted map so two annotations written with their
/// arguments in different order still hash and compare equal.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct AnnotationData {
    pub class_id: ClassId,
    pub args: BTreeMap<String, AnnotationValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Str(String),
    ClassRef(ClassId),
    EnumEntry(ClassId, String),
    Annotation(AnnotationData),
    Array(Vec<AnnotationValue>),
}

impl AnnotationData {
    pub fn new<C: Into<ClassId>>(class_id: C) -> Self {
        AnnotationData {
            class_id: class_id.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_arg<S: Into<String>>(mut self, name: S, value: AnnotationValue) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    pub fn bool_value(&self, name: &str) -> Option<bool> {
        match self.args.get(name) {
            Some(AnnotationValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn int_value(&self, name: &str) -> Option<i64> {
        match self.args.get(name) {
            Some(AnnotationValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn string_value(&self, name: &str) -> Option<&str> {
        match self.args.get(name) {
            Some(AnnotationValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn class_value(&self, name: &str) -> Option<&ClassId> {
        match self.args.get(name) {
            Some(AnnotationValue::ClassRef(class_id)) => Some(class_id),
            _ => None,
        }
    }

    /// A `[Foo::class, Bar::class]` argument. A single class ref is accepted
    /// as a one-element list.
    pub fn class_list_value(&self, name: &str) -> Vec<ClassId> {
        match self.args.get(name) {
            Some(AnnotationValue::Array(values)) => values
                .iter()
                .filter_map(|value| match value {
                    AnnotationValue::ClassRef(class_id) => Some(class_id.clone()),
                    _ => None,
                })
                .collect(),
            Some(AnnotationValue::ClassRef(class_id)) => vec![class_id.clone()],
            _ => Vec::new(),
        }
    }

    /// `@Qualified(name = "x")` style rendering for diagnostics.
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            return format!("@{}", self.class_id.short_name());
        }
        let args = self
            .args
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value.render()))
            .collect::<Vec<String>>()
            .join(", ");
        format!("@{}({})", self.class_id.short_name(), args)
    }
}

impl AnnotationValue {
    pub fn class_ref(type_data: &TypeData) -> AnnotationValue {
        AnnotationValue::ClassRef(type_data.class_id.clone())
    }

    pub fn render(&self) -> String {
        match self {
            AnnotationValue::Bool(value) => value.to_string(),
            AnnotationValue::Int(value) => value.to_string(),
            AnnotationValue::Str(value) => format!("\"{}\"", value),
            AnnotationValue::ClassRef(class_id) => format!("{}::class", class_id.short_name()),
            AnnotationValue::EnumEntry(class_id, entry) => {
                format!("{}.{}", class_id.short_name(), entry)
            }
            AnnotationValue::Annotation(annotation) => annotation.render(),
            AnnotationValue::Array(values) => {
                let rendered = values
                    .iter()
                    .map(AnnotationValue::render)
                    .collect::<Vec<String>>()
                    .join(", ");
                format!("[{}]", rendered)
            }
        }
    }
}

impl fmt::Display for AnnotationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
