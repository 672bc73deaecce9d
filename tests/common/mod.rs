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

#![allow(dead_code)]

use lattice::{
    AnnotationData, AnnotationValue, ClassDecl, ClassId, ClassKind, CollectingReporter,
    DeclarationIndex, Diagnostic, FieldDecl, FunctionDecl, ParameterDecl, ResolvedGraphPlan,
    Resolver, TypeData, TypeKey,
};

pub fn ty(name: &str) -> TypeData {
    TypeData::new(name)
}

pub fn ty_args(name: &str, args: Vec<TypeData>) -> TypeData {
    TypeData::with_args(name, args)
}

pub fn provider_of(inner: TypeData) -> TypeData {
    ty_args("lattice/Provider", vec![inner])
}

pub fn lazy_of(inner: TypeData) -> TypeData {
    ty_args("lattice/Lazy", vec![inner])
}

pub fn set_of(element: TypeData) -> TypeData {
    ty_args("std/Set", vec![element])
}

pub fn map_of(key: TypeData, value: TypeData) -> TypeData {
    ty_args("std/Map", vec![key, value])
}

pub fn key(name: &str) -> TypeKey {
    TypeKey::simple(ty(name))
}

pub fn key_of(type_data: TypeData) -> TypeKey {
    TypeKey::simple(type_data)
}

pub fn ann(name: &str) -> AnnotationData {
    AnnotationData::new(name)
}

/// A trait-like graph class carrying `@DependencyGraph`.
pub fn graph_class(name: &str) -> ClassDecl {
    let mut class = ClassDecl::new(name);
    class.kind = ClassKind::Interface;
    class.annotations = vec![ann("lattice/DependencyGraph")];
    class
}

pub fn accessor(name: &str, return_type: TypeData) -> FunctionDecl {
    let mut function = FunctionDecl::new(name, return_type);
    function.is_abstract = true;
    function
}

pub fn injector(name: &str, target: TypeData) -> FunctionDecl {
    let mut function = FunctionDecl::new(name, ty("std/Unit"));
    function.is_abstract = true;
    function.parameters = vec![ParameterDecl::new("target", target)];
    function
}

pub fn provides(name: &str, return_type: TypeData) -> FunctionDecl {
    let mut function = FunctionDecl::new(name, return_type);
    function.annotations = vec![ann("lattice/Provides")];
    function
}

pub fn binds(name: &str, source: TypeData, bound: TypeData) -> FunctionDecl {
    let mut function = FunctionDecl::new(name, bound);
    function.is_abstract = true;
    function.annotations = vec![ann("lattice/Binds")];
    function.parameters = vec![ParameterDecl::new("impl", source)];
    function
}

/// A class with an injectable constructor taking `dependencies`.
pub fn inject_class(name: &str, dependencies: Vec<TypeData>) -> ClassDecl {
    let mut class = ClassDecl::new(name);
    let mut constructor = FunctionDecl::new("<init>", ty(name));
    constructor.annotations = vec![ann("lattice/Inject")];
    constructor.parameters = dependencies
        .into_iter()
        .enumerate()
        .map(|(position, dependency)| ParameterDecl::new(format!("p{}", position), dependency))
        .collect();
    class.constructors = vec![constructor];
    class
}

pub fn inject_field(name: &str, field_type: TypeData) -> FieldDecl {
    FieldDecl {
        name: name.to_owned(),
        field_type,
        annotations: vec![ann("lattice/Inject")],
        is_mutable: true,
        location: None,
    }
}

/// Registers an annotation class marked as a scope.
pub fn register_scope(index: &mut DeclarationIndex, name: &str) {
    let mut class = ClassDecl::new(name);
    class.kind = ClassKind::AnnotationClass;
    class.annotations = vec![ann("lattice/Scope")];
    index.add_class(class);
}

/// Registers an annotation class marked as a qualifier.
pub fn register_qualifier(index: &mut DeclarationIndex, name: &str) {
    let mut class = ClassDecl::new(name);
    class.kind = ClassKind::AnnotationClass;
    class.annotations = vec![ann("lattice/Qualifier")];
    index.add_class(class);
}

/// Registers an annotation class marked as a map key.
pub fn register_map_key(index: &mut DeclarationIndex, name: &str) {
    let mut class = ClassDecl::new(name);
    class.kind = ClassKind::AnnotationClass;
    class.annotations = vec![ann("lattice/MapKey")];
    index.add_class(class);
}

pub fn class_ref(name: &str) -> AnnotationValue {
    AnnotationValue::ClassRef(ClassId::new(name))
}

pub fn int_key(value: i64) -> AnnotationData {
    ann("lattice/IntKey").with_arg("value", AnnotationValue::Int(value))
}

/// Resolves `graph` against `index`; failures come back as the collected
/// diagnostics.
pub fn resolve(index: &DeclarationIndex, graph: &str) -> Result<ResolvedGraphPlan, Vec<Diagnostic>> {
    let reporter = CollectingReporter::new();
    let resolver = Resolver::new(index, &reporter);
    match resolver.resolve(&ClassId::new(graph)) {
        Ok(plan) => Ok(plan),
        Err(_) => Err(reporter.errors()),
    }
}
