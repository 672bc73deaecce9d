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

//! Every way a value can be produced inside a graph.

pub mod absent;
pub mod alias;
pub mod assisted;
pub mod bound_instance;
pub mod constructor;
pub mod extension;
pub mod graph_dep;
pub mod members;
pub mod multibinding;
pub mod object;
pub mod provided;

use crate::annotation::AnnotationData;
use crate::diagnostics::{fail_at, DiagnosticCode, FatalDiagnostic, Location};
use crate::keys::{ContextualTypeKey, TypeKey};
use crate::parameters::Parameters;
use crate::stack::BindingStack;
use std::any::Any;
use std::fmt::Debug;

pub use absent::AbsentBinding;
pub use alias::AliasBinding;
pub use assisted::AssistedFactoryBinding;
pub use bound_instance::BoundInstanceBinding;
pub use constructor::ConstructorInjectedBinding;
pub use extension::{GraphExtensionBinding, GraphExtensionFactoryBinding};
pub use graph_dep::GraphDependencyBinding;
pub use members::MembersInjectedBinding;
pub use multibinding::{MultibindingBinding, MultibindingSource};
pub use object::ObjectClassBinding;
pub use provided::ProvidedBinding;

/// A binding for one `TypeKey` slot.
///
/// Implementations are shared (`Rc<dyn Binding>`) so a single instance can
/// be registered under more than one key, which map multibindings require.
pub trait Binding: Debug {
    fn type_key(&self) -> &TypeKey;

    fn contextual_type_key(&self) -> &ContextualTypeKey;

    /// Human readable name used in diagnostics and deterministic source
    /// ordering.
    fn name_hint(&self) -> String;

    fn scope(&self) -> Option<&AnnotationData> {
        None
    }

    fn parameters(&self) -> Option<&Parameters> {
        None
    }

    /// Contextual keys this binding needs the graph to satisfy. Forced only
    /// at validation time; bindings may be registered in any order.
    fn dependencies(&self) -> Vec<ContextualTypeKey>;

    fn location(&self) -> Option<&Location> {
        None
    }

    /// True for contributions that feed a multibinding rather than a
    /// standalone slot.
    fn is_into_multibinding(&self) -> bool {
        false
    }

    /// Whole-node deferrability: the generated code reaches this binding
    /// through a factory, so any cycle through it can be broken here.
    fn is_implicitly_deferrable(&self) -> bool {
        false
    }

    /// Never materialized in a graph.
    fn is_absent(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Binding {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Duplicate registration for one slot is always a diagnostic.
    pub fn duplicated<T>(
        existing: &dyn Binding,
        new: &dyn Binding,
        stack: &BindingStack,
    ) -> Result<T, FatalDiagnostic> {
        let locations = [existing.location(), new.location()]
            .into_iter()
            .flatten()
            .map(|location| format!("\n    at {}", location))
            .collect::<String>();
        fail_at(
            DiagnosticCode::DuplicateBinding,
            format!(
                "found duplicated bindings for {}, provided by:\n\t{}\n\t{}{}\n{}",
                existing.type_key().render(false),
                existing.name_hint(),
                new.name_hint(),
                locations,
                stack.render(16),
            ),
            new.location().cloned().or_else(|| stack.last_location()),
        )
    }
}
