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

//! Canonical identity for bindable types.
//!
//! `T`, `Provider<T>`, `Lazy<T>` and `Provider<Lazy<T>>` all resolve the same
//! binding slot; `Map<K, Provider<V>>` collapses to `Map<K, V>`. The wrapper
//! structure is preserved next to the key so call sites can still be emitted
//! with the right indirection.

use crate::annotation::AnnotationData;
use crate::class_ids::ClassIds;
use crate::type_data::{ClassId, TypeData};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a binding slot: canonical type plus optional qualifier.
///
/// Ordering and hashing delegate to the full render string, which keeps
/// every sorted container in the resolver deterministic.
#[derive(Debug, Clone, Eq)]
pub struct TypeKey {
    type_data: TypeData,
    qualifier: Option<AnnotationData>,
    rendered: String,
}

impl TypeKey {
    pub fn new(type_data: TypeData, qualifier: Option<AnnotationData>) -> Self {
        let canonical = type_data.normalize();
        let rendered = Self::render_parts(&canonical, qualifier.as_ref(), false);
        TypeKey {
            type_data: canonical,
            qualifier,
            rendered,
        }
    }

    pub fn simple(type_data: TypeData) -> Self {
        TypeKey::new(type_data, None)
    }

    pub fn type_data(&self) -> &TypeData {
        &self.type_data
    }

    pub fn qualifier(&self) -> Option<&AnnotationData> {
        self.qualifier.as_ref()
    }

    pub fn class_id(&self) -> &ClassId {
        &self.type_data.class_id
    }

    pub fn render(&self, short: bool) -> String {
        if short {
            return Self::render_parts(&self.type_data, self.qualifier.as_ref(), true);
        }
        self.rendered.clone()
    }

    fn render_parts(type_data: &TypeData, qualifier: Option<&AnnotationData>, short: bool) -> String {
        match qualifier {
            Some(qualifier) => format!("{} {}", qualifier.render(), type_data.render(short)),
            None => type_data.render(short),
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.rendered.eq(&other.rendered)
    }
}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state)
    }
}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rendered.cmp(&other.rendered)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

/// Wrapper structure of a requested type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WrappedType {
    Canonical(TypeData),
    Provider {
        inner: Box<WrappedType>,
        class_id: ClassId,
    },
    Lazy {
        inner: Box<WrappedType>,
        class_id: ClassId,
    },
    Map {
        key: TypeData,
        value: Box<WrappedType>,
        class_id: ClassId,
    },
}

impl WrappedType {
    /// Recursive structural decomposition of a raw type.
    ///
    /// `Map<K, V>` recurses on the value; known provider and lazy classes
    /// recurse on their sole argument; everything else is canonical after
    /// flexible-nullability normalization.
    pub fn parse(raw: &TypeData, class_ids: &ClassIds) -> WrappedType {
        if class_ids.is_map(&raw.class_id) && raw.args.len() == 2 {
            return WrappedType::Map {
                key: raw.args[0].normalize(),
                value: Box::new(WrappedType::parse(&raw.args[1], class_ids)),
                class_id: raw.class_id.clone(),
            };
        }
        if class_ids.is_provider(&raw.class_id) && raw.args.len() == 1 {
            return WrappedType::Provider {
                inner: Box::new(WrappedType::parse(&raw.args[0], class_ids)),
                class_id: raw.class_id.clone(),
            };
        }
        if class_ids.is_lazy(&raw.class_id) && raw.args.len() == 1 {
            return WrappedType::Lazy {
                inner: Box::new(WrappedType::parse(&raw.args[0], class_ids)),
                class_id: raw.class_id.clone(),
            };
        }
        WrappedType::Canonical(raw.normalize())
    }

    /// Unwraps to the innermost type; map values unwrap in place.
    pub fn canonical_type(&self) -> TypeData {
        match self {
            WrappedType::Canonical(type_data) => type_data.clone(),
            WrappedType::Provider { inner, .. } | WrappedType::Lazy { inner, .. } => {
                inner.canonical_type()
            }
            WrappedType::Map {
                key,
                value,
                class_id,
            } => TypeData::with_args(class_id.clone(), vec![key.clone(), value.canonical_type()]),
        }
    }

    /// True iff any `Provider` or `Lazy` node appears anywhere, including
    /// inside a map's value sub-tree.
    pub fn is_deferrable(&self) -> bool {
        match self {
            WrappedType::Canonical(_) => false,
            WrappedType::Provider { .. } | WrappedType::Lazy { .. } => true,
            WrappedType::Map { value, .. } => value.is_deferrable(),
        }
    }

    pub fn find_map_value_type(&self) -> Option<&WrappedType> {
        match self {
            WrappedType::Map { value, .. } => Some(value),
            WrappedType::Provider { inner, .. } | WrappedType::Lazy { inner, .. } => {
                inner.find_map_value_type()
            }
            WrappedType::Canonical(_) => None,
        }
    }

    /// Renders the wrapper nesting, formatting leaf types with `f`.
    pub fn render(&self, f: &dyn Fn(&TypeData) -> String) -> String {
        match self {
            WrappedType::Canonical(type_data) => f(type_data),
            WrappedType::Provider { inner, class_id } | WrappedType::Lazy { inner, class_id } => {
                format!("{}<{}>", class_id.short_name(), inner.render(f))
            }
            WrappedType::Map {
                key,
                value,
                class_id,
            } => format!(
                "{}<{}, {}>",
                class_id.short_name(),
                f(key),
                value.render(f)
            ),
        }
    }
}

/// A `TypeKey` as it appears at a request site: the wrapper structure, a
/// default-value marker, and the user-written type for re-emission.
///
/// `raw_type` and `has_default` are excluded from identity.
#[derive(Debug, Clone, Eq)]
pub struct ContextualTypeKey {
    type_key: TypeKey,
    wrapped: WrappedType,
    has_default: bool,
    raw_type: Option<TypeData>,
    rendered: String,
}

impl ContextualTypeKey {
    pub fn from_type(
        raw: &TypeData,
        qualifier: Option<AnnotationData>,
        has_default: bool,
        class_ids: &ClassIds,
    ) -> Self {
        let wrapped = WrappedType::parse(raw, class_ids);
        let type_key = TypeKey::new(wrapped.canonical_type(), qualifier);
        Self::new(type_key, wrapped, has_default, Some(raw.clone()))
    }

    /// A bare request for an already canonical key.
    pub fn from_type_key(type_key: TypeKey) -> Self {
        let wrapped = WrappedType::Canonical(type_key.type_data().clone());
        Self::new(type_key, wrapped, false, None)
    }

    fn new(
        type_key: TypeKey,
        wrapped: WrappedType,
        has_default: bool,
        raw_type: Option<TypeData>,
    ) -> Self {
        let rendered = match type_key.qualifier() {
            Some(qualifier) => format!(
                "{} {}",
                qualifier.render(),
                wrapped.render(&|t| t.render(false))
            ),
            None => wrapped.render(&|t| t.render(false)),
        };
        ContextualTypeKey {
            type_key,
            wrapped,
            has_default,
            raw_type,
            rendered,
        }
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    pub fn wrapped(&self) -> &WrappedType {
        &self.wrapped
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    pub fn raw_type(&self) -> Option<&TypeData> {
        self.raw_type.as_ref()
    }

    pub fn is_wrapped_in_provider(&self) -> bool {
        matches!(self.wrapped, WrappedType::Provider { .. })
    }

    pub fn is_wrapped_in_lazy(&self) -> bool {
        matches!(self.wrapped, WrappedType::Lazy { .. })
    }

    pub fn is_lazy_wrapped_in_provider(&self) -> bool {
        match &self.wrapped {
            WrappedType::Provider { inner, .. } => matches!(**inner, WrappedType::Lazy { .. }),
            _ => false,
        }
    }

    pub fn is_deferrable(&self) -> bool {
        self.wrapped.is_deferrable()
    }

    /// Deferrable requests are satisfied through a provider instance rather
    /// than a direct call.
    pub fn requires_provider_instance(&self) -> bool {
        self.is_deferrable()
    }

    /// `@Q Provider<Lazy<X>> = ...` style rendering.
    pub fn render(&self, short: bool) -> String {
        let body = match self.type_key.qualifier() {
            Some(qualifier) => format!(
                "{} {}",
                qualifier.render(),
                self.wrapped.render(&|t| t.render(short))
            ),
            None => self.wrapped.render(&|t| t.render(short)),
        };
        if self.has_default {
            format!("{} = ...", body)
        } else {
            body
        }
    }
}

impl PartialEq for ContextualTypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.rendered.eq(&other.rendered)
    }
}

impl Hash for ContextualTypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state)
    }
}

impl PartialOrd for ContextualTypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContextualTypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rendered.cmp(&other.rendered)
    }
}

impl fmt::Display for ContextualTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> ClassIds {
        ClassIds::default()
    }

    fn provider_of(inner: TypeData) -> TypeData {
        TypeData::with_args("lattice/Provider", vec![inner])
    }

    fn lazy_of(inner: TypeData) -> TypeData {
        TypeData::with_args("lattice/Lazy", vec![inner])
    }

    fn map_of(key: TypeData, value: TypeData) -> TypeData {
        TypeData::with_args("std/Map", vec![key, value])
    }

    #[test]
    fn wrappers_collapse_to_one_key() {
        let ids = ids();
        let plain = TypeData::new("com/example/Service");
        let keys = [
            ContextualTypeKey::from_type(&plain, None, false, &ids),
            ContextualTypeKey::from_type(&provider_of(plain.clone()), None, false, &ids),
            ContextualTypeKey::from_type(&lazy_of(plain.clone()), None, false, &ids),
            ContextualTypeKey::from_type(&provider_of(lazy_of(plain.clone())), None, false, &ids),
        ];
        for key in &keys[1..] {
            assert_eq!(key.type_key(), keys[0].type_key());
            assert!(key.is_deferrable());
        }
        assert!(!keys[0].is_deferrable());
    }

    #[test]
    fn map_value_wrappers_collapse() {
        let ids = ids();
        let value = TypeData::new("std/String");
        let direct = map_of(TypeData::new("std/Int"), value.clone());
        let wrapped = map_of(TypeData::new("std/Int"), provider_of(value));
        let a = ContextualTypeKey::from_type(&direct, None, false, &ids);
        let b = ContextualTypeKey::from_type(&wrapped, None, false, &ids);
        assert_eq!(a.type_key(), b.type_key());
        assert!(!a.is_deferrable());
        assert!(b.is_deferrable());
    }

    #[test]
    fn canonical_type_round_trips_through_nesting() {
        let ids = ids();
        let inner = map_of(TypeData::new("std/Int"), TypeData::new("std/String"));
        let wrapped = WrappedType::parse(&provider_of(provider_of(inner.clone())), &ids);
        assert_eq!(wrapped.canonical_type(), inner);
    }

    #[test]
    fn qualifier_distinguishes_keys() {
        let qualifier = AnnotationData::new("com/example/Named");
        let plain = TypeKey::simple(TypeData::new("std/String"));
        let named = TypeKey::new(TypeData::new("std/String"), Some(qualifier));
        assert_ne!(plain, named);
        assert!(named.render(false).starts_with("@Named"));
    }

    #[test]
    fn lazy_in_provider_detected() {
        let ids = ids();
        let key = ContextualTypeKey::from_type(
            &provider_of(lazy_of(TypeData::new("com/example/Api"))),
            None,
            false,
            &ids,
        );
        assert!(key.is_wrapped_in_provider());
        assert!(key.is_lazy_wrapped_in_provider());
        assert!(!key.is_wrapped_in_lazy());
    }

    #[test]
    fn raw_type_excluded_from_identity() {
        let ids = ids();
        let plain = TypeData::new("com/example/Service");
        let a = ContextualTypeKey::from_type(&plain, None, false, &ids);
        let b = ContextualTypeKey::from_type_key(a.type_key().clone());
        assert_eq!(a, b);
    }

    #[test]
    fn unqualified_key_round_trips_through_render() {
        let key = TypeKey::simple(map_of(
            TypeData::new("std/Int"),
            TypeData::new("com/example/Service"),
        ));
        let parsed = TypeData::parse(&key.render(false)).unwrap();
        assert_eq!(TypeKey::simple(parsed), key);
    }

    #[test]
    fn ordering_is_render_lexicographic() {
        let a = TypeKey::simple(TypeData::new("com/a/Alpha"));
        let b = TypeKey::simple(TypeData::new("com/b/Beta"));
        assert!(a < b);
        assert_eq!(a.render(false), "com.a.Alpha");
    }
}
