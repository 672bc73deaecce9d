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

//! Compile-time dependency injection graph resolver.
//!
//! The language frontend populates a [`DeclarationIndex`] with class,
//! function, and annotation facts, then asks the [`Resolver`] to turn each
//! graph class into a [`ResolvedGraphPlan`]: a validated, topologically
//! ordered binding plan a code generator consumes. Nothing here touches
//! source text or emits code.
//!
//! Determinism is load-bearing: every container iterated for output is
//! sorted by rendered type keys, so the same declarations always produce
//! the same plan.

pub mod annotation;
pub mod bindings;
pub mod class_ids;
pub mod contributions;
pub mod declarations;
pub mod diagnostics;
pub mod graph;
pub mod graph_node;
pub mod keys;
pub mod lookup;
pub mod manifest;
pub mod memoized;
pub mod metadata;
pub mod parameters;
pub mod parent;
pub mod planner;
pub mod sort;
pub mod stack;
pub mod type_data;
pub mod validator;

mod resolver;

pub use crate::annotation::{AnnotationData, AnnotationValue};
pub use crate::class_ids::ClassIds;
pub use crate::declarations::{
    ClassDecl, ClassKind, DeclarationIndex, FieldDecl, FunctionDecl, ParameterDecl, Visibility,
};
pub use crate::diagnostics::{
    CollectingReporter, Diagnostic, DiagnosticCode, DiagnosticReporter, FatalDiagnostic, Location,
};
pub use crate::keys::{ContextualTypeKey, TypeKey, WrappedType};
pub use crate::manifest::{build_index, DeclarationManifest, ScopeHint};
pub use crate::metadata::GraphMetadata;
pub use crate::resolver::{
    LookupTracker, ResolvedGraphPlan, Resolver, ResolverContext, ResolverOptions,
};
pub use crate::type_data::{ClassId, TypeData};
