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

use crate::class_ids::ClassIds;
use crate::declarations::{DeclarationIndex, FunctionDecl, ParameterDecl};
use crate::diagnostics::Location;
use crate::keys::ContextualTypeKey;

/// A provider/constructor/injector parameter, reduced to what binding
/// resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub contextual_key: ContextualTypeKey,
    /// Supplied at run time through an assisted factory, not by the graph.
    pub is_assisted: bool,
    pub assisted_identifier: String,
    /// Supplied by the graph creator at construction.
    pub is_bound_instance: bool,
    pub location: Option<Location>,
}

impl Parameter {
    pub fn from_decl(
        decl: &ParameterDecl,
        index: &DeclarationIndex,
        class_ids: &ClassIds,
    ) -> Parameter {
        let qualifier = index.qualifier_annotation(&decl.annotations, class_ids);
        let is_assisted = decl.has_annotation(&class_ids.assisted);
        let assisted_identifier = decl
            .annotations
            .iter()
            .find(|a| a.class_id.eq(&class_ids.assisted))
            .and_then(|a| a.string_value("value"))
            .unwrap_or("")
            .to_owned();
        Parameter {
            name: decl.name.clone(),
            contextual_key: ContextualTypeKey::from_type(
                &decl.param_type,
                qualifier,
                decl.has_default,
                class_ids,
            ),
            is_assisted,
            assisted_identifier,
            is_bound_instance: decl.has_annotation(&class_ids.binds_instance),
            location: None,
        }
    }
}

/// Ordered parameter list of a callable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Parameters(parameters)
    }

    pub fn from_function(
        function: &FunctionDecl,
        index: &DeclarationIndex,
        class_ids: &ClassIds,
    ) -> Parameters {
        Parameters(
            function
                .parameters
                .iter()
                .map(|decl| Parameter::from_decl(decl, index, class_ids))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Parameters the graph must satisfy: everything not assisted and not
    /// creator-supplied.
    pub fn graph_dependencies(&self) -> Vec<ContextualTypeKey> {
        self.0
            .iter()
            .filter(|p| !p.is_assisted && !p.is_bound_instance)
            .map(|p| p.contextual_key.clone())
            .collect()
    }

    pub fn assisted(&self) -> Vec<&Parameter> {
        self.0.iter().filter(|p| p.is_assisted).collect()
    }

    /// Stable sort-key component for multibinding source ordering.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|p| p.contextual_key.render(false))
            .collect::<Vec<String>>()
            .join(", ")
    }
}
