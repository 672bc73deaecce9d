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

use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Fully qualified class name, `/`-separated (`com/example/Repository`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct ClassId(String);

impl ClassId {
    pub fn new<S: Into<String>>(name: S) -> Self {
        ClassId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of the qualified name.
    pub fn short_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn package(&self) -> &str {
        match self.0.rfind('/') {
            Some(index) => &self.0[..index],
            None => "",
        }
    }

    /// Dotted form used in rendered diagnostics and persisted metadata.
    pub fn dotted(&self) -> String {
        self.0.replace('/', ".")
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        ClassId::new(name)
    }
}

impl From<String> for ClassId {
    fn from(name: String) -> Self {
        ClassId(name)
    }
}

/// A fully substituted structural type.
///
/// Generic arguments are carried in `args`; a type parameter that survived
/// substitution is flagged `type_variable` and keeps the parameter name in
/// `class_id`. Flexible nullability marks types whose nullability the
/// frontend could not decide.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Eq)]
pub struct TypeData {
    pub class_id: ClassId,
    pub args: Vec<TypeData>,
    pub nullable: bool,
    pub flexible_nullability: bool,
    pub type_variable: bool,
}

impl PartialEq for TypeData {
    fn eq(&self, other: &Self) -> bool {
        self.render(false).eq(&other.render(false))
    }
}

impl Hash for TypeData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.render(false).hash(state)
    }
}

impl PartialOrd for TypeData {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeData {
    fn cmp(&self, other: &Self) -> Ordering {
        self.render(false).cmp(&other.render(false))
    }
}

impl TypeData {
    pub fn new<C: Into<ClassId>>(class_id: C) -> Self {
        TypeData {
            class_id: class_id.into(),
            ..Default::default()
        }
    }

    pub fn with_args<C: Into<ClassId>>(class_id: C, args: Vec<TypeData>) -> Self {
        TypeData {
            class_id: class_id.into(),
            args,
            ..Default::default()
        }
    }

    pub fn type_variable<S: Into<String>>(name: S) -> Self {
        TypeData {
            class_id: ClassId::new(name),
            type_variable: true,
            ..Default::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Strips nullability, including the flexible flag.
    pub fn make_not_null(&self) -> TypeData {
        let mut result = self.clone();
        result.nullable = false;
        result.flexible_nullability = false;
        result
    }

    /// Flexible nullability collapses to non-null for binding identity.
    pub fn normalize(&self) -> TypeData {
        if self.flexible_nullability {
            return self.make_not_null();
        }
        self.clone()
    }

    /// Replaces type variables by name using `substitutions`. Unknown
    /// variables are left in place.
    pub fn substitute(&self, substitutions: &HashMap<String, TypeData>) -> TypeData {
        if self.type_variable {
            if let Some(concrete) = substitutions.get(self.class_id.as_str()) {
                let mut result = concrete.clone();
                result.nullable = result.nullable || self.nullable;
                return result;
            }
            return self.clone();
        }
        let mut result = self.clone();
        result.args = self
            .args
            .iter()
            .map(|arg| arg.substitute(substitutions))
            .collect();
        result
    }

    /// Parses the full (`short = false`) rendering back into a type. Lossy
    /// inputs (type variables, qualifiers) are out of scope; for everything
    /// else `parse(render(false))` round-trips.
    pub fn parse(rendered: &str) -> anyhow::Result<TypeData> {
        let (type_data, rest) = parse_type(rendered.trim())?;
        ensure!(
            rest.trim().is_empty(),
            "trailing input {:?} after type {:?}",
            rest,
            rendered
        );
        Ok(type_data)
    }

    /// Deterministic rendering, `Map<K, V>` style. `short` uses simple class
    /// names for human-facing messages; the full form is the identity every
    /// comparison and sorted container relies on.
    pub fn render(&self, short: bool) -> String {
        let name = if self.type_variable {
            self.class_id.as_str().to_owned()
        } else if short {
            self.class_id.short_name().to_owned()
        } else {
            self.class_id.dotted()
        };
        let mut result = if self.args.is_empty() {
            name
        } else {
            let args = self
                .args
                .iter()
                .map(|arg| arg.render(short))
                .collect::<Vec<String>>()
                .join(", ");
            format!("{}<{}>", name, args)
        };
        if self.nullable {
            result.push('?');
        } else if self.flexible_nullability {
            result.push('!');
        }
        result
    }
}

impl fmt::Display for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

fn parse_type(input: &str) -> anyhow::Result<(TypeData, &str)> {
    let name_end = input
        .find(|c| c == '<' || c == ',' || c == '>' || c == '?' || c == '!')
        .unwrap_or(input.len());
    let name = input[..name_end].trim();
    ensure!(!name.is_empty(), "type name expected in {:?}", input);
    let mut rest = &input[name_end..];

    let mut args = Vec::new();
    if let Some(after) = rest.strip_prefix('<') {
        rest = after;
        loop {
            let (argument, remaining) = parse_type(rest)?;
            args.push(argument);
            rest = remaining.trim_start();
            if let Some(after_comma) = rest.strip_prefix(',') {
                rest = after_comma.trim_start();
                continue;
            }
            if let Some(after_close) = rest.strip_prefix('>') {
                rest = after_close;
                break;
            }
            bail!("expected ',' or '>' in type arguments near {:?}", rest);
        }
    }

    let mut result = TypeData::with_args(ClassId::new(name.replace('.', "/")), args);
    if let Some(after) = rest.strip_prefix('?') {
        result.nullable = true;
        rest = after;
    } else if let Some(after) = rest.strip_prefix('!') {
        result.flexible_nullability = true;
        rest = after;
    }
    Ok((result, rest))
}
