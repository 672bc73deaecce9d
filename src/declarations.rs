/*
Copyright 2020 Google LLC

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

//! Declarations supplied by the language frontend.
//!
//! The resolver never parses source; it consumes this serde model, which the
//! frontend populates per compilation unit and merges from dependencies.

use crate::annotation::AnnotationData;
use crate::class_ids::ClassIds;
use crate::diagnostics::Location;
use crate::type_data::{ClassId, TypeData};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    /// A language-level singleton value.
    Object,
    AnnotationClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Visibility {
    #[default]
    Public,
    Internal,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParameterDecl {
    pub name: String,
    pub param_type: TypeData,
    pub annotations: Vec<AnnotationData>,
    pub has_default: bool,
}

impl ParameterDecl {
    pub fn new<S: Into<String>>(name: S, param_type: TypeData) -> Self {
        ParameterDecl {
            name: name.into(),
            param_type,
            ..Default::default()
        }
    }

    pub fn has_annotation(&self, class_id: &ClassId) -> bool {
        self.annotations.iter().any(|a| a.class_id.eq(class_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FunctionDecl {
    pub name: String,
    pub parameters: Vec<ParameterDecl>,
    pub return_type: TypeData,
    pub annotations: Vec<AnnotationData>,
    pub is_abstract: bool,
    pub is_override: bool,
    pub location: Option<Location>,
}

impl FunctionDecl {
    pub fn new<S: Into<String>>(name: S, return_type: TypeData) -> Self {
        FunctionDecl {
            name: name.into(),
            return_type,
            ..Default::default()
        }
    }

    pub fn annotation(&self, class_id: &ClassId) -> Option<&AnnotationData> {
        self.annotations.iter().find(|a| a.class_id.eq(class_id))
    }

    pub fn has_annotation(&self, class_id: &ClassId) -> bool {
        self.annotation(class_id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldDecl {
    pub name: String,
    pub field_type: TypeData,
    pub annotations: Vec<AnnotationData>,
    pub is_mutable: bool,
    pub location: Option<Location>,
}

impl FieldDecl {
    pub fn has_annotation(&self, class_id: &ClassId) -> bool {
        self.annotations.iter().any(|a| a.class_id.eq(class_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassDecl {
    pub class_id: ClassId,
    pub kind: ClassKind,
    pub visibility: Visibility,
    /// Compilation module the class originates from; used for visibility
    /// filtering of contributions across module boundaries.
    pub module_name: String,
    pub type_parameters: Vec<String>,
    pub supertypes: Vec<TypeData>,
    pub annotations: Vec<AnnotationData>,
    pub constructors: Vec<FunctionDecl>,
    pub functions: Vec<FunctionDecl>,
    pub fields: Vec<FieldDecl>,
    pub companion: Option<ClassId>,
    pub location: Option<Location>,
}

impl ClassDecl {
    pub fn new<C: Into<ClassId>>(class_id: C) -> Self {
        ClassDecl {
            class_id: class_id.into(),
            ..Default::default()
        }
    }

    pub fn annotation(&self, class_id: &ClassId) -> Option<&AnnotationData> {
        self.annotations.iter().find(|a| a.class_id.eq(class_id))
    }

    pub fn has_annotation(&self, class_id: &ClassId) -> bool {
        self.annotation(class_id).is_some()
    }

    /// The constructor marked for injection, or the sole constructor of a
    /// class whose declaration itself carries the inject marker.
    pub fn inject_constructor(&self, class_ids: &ClassIds) -> Option<&FunctionDecl> {
        if let Some(ctor) = self
            .constructors
            .iter()
            .find(|c| c.has_annotation(&class_ids.inject))
        {
            return Some(ctor);
        }
        if self.has_annotation(&class_ids.inject) {
            return self.constructors.first();
        }
        None
    }

    /// Single abstract function of a factory interface.
    pub fn single_abstract_function(&self) -> Option<&FunctionDecl> {
        let mut abstracts = self.functions.iter().filter(|f| f.is_abstract);
        let first = abstracts.next()?;
        if abstracts.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// The type of this class with its own parameters as arguments.
    pub fn declared_type(&self) -> TypeData {
        TypeData::with_args(
            self.class_id.clone(),
            self.type_parameters
                .iter()
                .map(|parameter| TypeData::type_variable(parameter.as_str()))
                .collect(),
        )
    }
}

/// All facts the resolver needs, supplied by the frontend.
///
/// The scope-hint table carries contributions surfaced by upstream
/// compilations' generated hint declarations, keyed by scope class.
#[derive(Debug, Default)]
pub struct DeclarationIndex {
    classes: BTreeMap<ClassId, ClassDecl>,
    scope_hints: BTreeMap<ClassId, Vec<ClassId>>,
    current_module: String,
}

impl DeclarationIndex {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_current_module<S: Into<String>>(&mut self, module: S) {
        self.current_module = module.into();
    }

    pub fn current_module(&self) -> &str {
        &self.current_module
    }

    pub fn add_class(&mut self, class: ClassDecl) {
        self.classes.insert(class.class_id.clone(), class);
    }

    pub fn add_scope_hint(&mut self, scope: ClassId, contribution: ClassId) {
        self.scope_hints.entry(scope).or_default().push(contribution);
    }

    pub fn class(&self, class_id: &ClassId) -> Option<&ClassDecl> {
        self.classes.get(class_id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values()
    }

    /// Contributions surfaced by generated hint declarations for `scope`.
    pub fn hinted_contributions(&self, scope: &ClassId) -> &[ClassId] {
        self.scope_hints
            .get(scope)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Transitive supertypes of `class_id`, concretized through the
    /// inheritance chain, deduplicated, breadth-first.
    pub fn all_supertypes(&self, class_id: &ClassId) -> Vec<TypeData> {
        let mut result = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue: Vec<TypeData> = match self.classes.get(class_id) {
            Some(class) => class.supertypes.clone(),
            None => return result,
        };
        while !queue.is_empty() {
            let mut next = Vec::new();
            for supertype in queue {
                if !seen.insert(supertype.render(false)) {
                    continue;
                }
                if let Some(decl) = self.classes.get(&supertype.class_id) {
                    let substitutions = substitution_for(decl, &supertype);
                    for grand in &decl.supertypes {
                        next.push(grand.substitute(&substitutions));
                    }
                }
                result.push(supertype);
            }
            queue = next;
        }
        result
    }

    /// Nominal subtyping: equal types, or `b` appears in `a`'s supertype
    /// closure.
    pub fn is_subtype(&self, a: &TypeData, b: &TypeData) -> bool {
        if a.normalize().eq(&b.normalize()) {
            return true;
        }
        self.all_supertypes(&a.class_id)
            .iter()
            .any(|supertype| supertype.normalize().eq(&b.normalize()))
    }

    /// The qualifier among `annotations`: the one whose annotation class is
    /// itself marked as a qualifier.
    pub fn qualifier_annotation(
        &self,
        annotations: &[AnnotationData],
        class_ids: &ClassIds,
    ) -> Option<AnnotationData> {
        self.find_marked(annotations, &class_ids.qualifier_marker)
    }

    pub fn scope_annotation(
        &self,
        annotations: &[AnnotationData],
        class_ids: &ClassIds,
    ) -> Option<AnnotationData> {
        self.find_marked(annotations, &class_ids.scope_marker)
    }

    pub fn map_key_annotation(
        &self,
        annotations: &[AnnotationData],
        class_ids: &ClassIds,
    ) -> Option<AnnotationData> {
        self.find_marked(annotations, &class_ids.map_key_marker)
    }

    fn find_marked(
        &self,
        annotations: &[AnnotationData],
        marker: &ClassId,
    ) -> Option<AnnotationData> {
        annotations
            .iter()
            .find(|annotation| {
                self.classes
                    .get(&annotation.class_id)
                    .map(|decl| decl.has_annotation(marker))
                    .unwrap_or(false)
            })
            .cloned()
    }
}

/// Maps a class's type parameters to the arguments of a concrete use site.
pub fn substitution_for(decl: &ClassDecl, concrete: &TypeData) -> HashMap<String, TypeData> {
    decl.type_parameters
        .iter()
        .cloned()
        .zip(concrete.args.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supertype_closure_substitutes_arguments() {
        let mut index = DeclarationIndex::new();
        let mut base = ClassDecl::new("com/example/Repo");
        base.kind = ClassKind::Interface;
        base.type_parameters = vec!["T".to_owned()];
        base.supertypes = vec![TypeData::with_args(
            "com/example/ReadOnly",
            vec![TypeData::type_variable("T")],
        )];
        index.add_class(base);
        let mut user = ClassDecl::new("com/example/UserRepo");
        user.supertypes = vec![TypeData::with_args(
            "com/example/Repo",
            vec![TypeData::new("com/example/User")],
        )];
        index.add_class(user);

        let supertypes = index.all_supertypes(&ClassId::new("com/example/UserRepo"));
        assert!(supertypes.contains(&TypeData::with_args(
            "com/example/Repo",
            vec![TypeData::new("com/example/User")]
        )));
        assert!(supertypes.contains(&TypeData::with_args(
            "com/example/ReadOnly",
            vec![TypeData::new("com/example/User")]
        )));
    }

    #[test]
    fn qualifier_detected_through_marker() {
        let class_ids = ClassIds::default();
        let mut index = DeclarationIndex::new();
        let mut named = ClassDecl::new("com/example/Named");
        named.kind = ClassKind::AnnotationClass;
        named.annotations = vec![AnnotationData::new(class_ids.qualifier_marker.clone())];
        index.add_class(named);

        let annotations = vec![AnnotationData::new("com/example/Named")];
        assert!(index.qualifier_annotation(&annotations, &class_ids).is_some());
        assert!(index.scope_annotation(&annotations, &class_ids).is_none());
    }
}
