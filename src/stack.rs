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

//! Human-readable resolution trace for diagnostics. The stack never
//! participates in binding identity.

use crate::diagnostics::Location;
use crate::keys::{ContextualTypeKey, TypeKey};

#[derive(Debug, Clone)]
pub struct BindingStackEntry {
    pub contextual_key: ContextualTypeKey,
    pub usage: String,
    pub context: String,
    pub is_synthetic: bool,
    pub location: Option<Location>,
}

impl BindingStackEntry {
    pub fn requested_at(contextual_key: ContextualTypeKey, accessor: &str) -> Self {
        BindingStackEntry {
            contextual_key,
            usage: "requested at".to_owned(),
            context: accessor.to_owned(),
            is_synthetic: false,
            location: None,
        }
    }

    pub fn injected_at(contextual_key: ContextualTypeKey, owner: &str, parameter: &str) -> Self {
        BindingStackEntry {
            contextual_key,
            usage: "injected at".to_owned(),
            context: format!("{}({})", owner, parameter),
            is_synthetic: false,
            location: None,
        }
    }

    pub fn provided_at(contextual_key: ContextualTypeKey, provider: &str) -> Self {
        BindingStackEntry {
            contextual_key,
            usage: "provided at".to_owned(),
            context: provider.to_owned(),
            is_synthetic: false,
            location: None,
        }
    }

    pub fn contributed_to_multibinding(contextual_key: ContextualTypeKey, target: &str) -> Self {
        BindingStackEntry {
            contextual_key,
            usage: "contributed to".to_owned(),
            context: target.to_owned(),
            is_synthetic: true,
            location: None,
        }
    }

    pub fn simple_type_ref(contextual_key: ContextualTypeKey) -> Self {
        let context = contextual_key.render(true);
        BindingStackEntry {
            contextual_key,
            usage: "referenced".to_owned(),
            context,
            is_synthetic: true,
            location: None,
        }
    }

    pub fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn display_key(&self) -> String {
        self.contextual_key.render(true)
    }
}

/// Push/pop trace owned by one graph resolution.
#[derive(Debug)]
pub struct BindingStack {
    graph_name: String,
    entries: Vec<BindingStackEntry>,
}

impl BindingStack {
    pub fn new<S: Into<String>>(graph_name: S) -> Self {
        BindingStack {
            graph_name: graph_name.into(),
            entries: Vec::new(),
        }
    }

    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    pub fn push(&mut self, entry: BindingStackEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<BindingStackEntry> {
        self.entries.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[BindingStackEntry] {
        &self.entries
    }

    pub fn entry_for(&self, key: &TypeKey) -> Option<&BindingStackEntry> {
        self.entries
            .iter()
            .find(|entry| entry.contextual_key.type_key().eq(key))
    }

    /// All entries from the first occurrence of `key` to the top; the cycle
    /// segment for cycle rendering.
    pub fn entries_since(&self, key: &TypeKey) -> Vec<&BindingStackEntry> {
        let start = self
            .entries
            .iter()
            .position(|entry| entry.contextual_key.type_key().eq(key));
        match start {
            Some(start) => self.entries[start..].iter().collect(),
            None => Vec::new(),
        }
    }

    /// Report site for a diagnostic: the most recent entry's context, or the
    /// graph itself when the stack is empty.
    pub fn last_entry_or_graph(&self) -> String {
        self.entries
            .last()
            .map(|entry| entry.context.clone())
            .unwrap_or_else(|| self.graph_name.clone())
    }

    pub fn last_location(&self) -> Option<Location> {
        self.entries.iter().rev().find_map(|e| e.location.clone())
    }

    /// Renders the trace as a table. Entries beyond `limit` are elided with
    /// an ellipsis row.
    pub fn render(&self, limit: usize) -> String {
        let mut rows: Vec<[String; 6]> = Vec::new();
        let truncated = self.entries.len() > limit;
        let visible = if truncated {
            &self.entries[self.entries.len() - limit..]
        } else {
            &self.entries[..]
        };
        let offset = self.entries.len() - visible.len();
        for (index, entry) in visible.iter().enumerate() {
            rows.push([
                (offset + index).to_string(),
                entry.display_key(),
                entry.usage.clone(),
                entry.contextual_key.type_key().render(false),
                entry.context.clone(),
                if entry.contextual_key.is_deferrable() {
                    "deferrable".to_owned()
                } else {
                    "strict".to_owned()
                },
            ]);
        }
        let header = [
            "Index".to_owned(),
            "Display Key".to_owned(),
            "Usage".to_owned(),
            "Key".to_owned(),
            "Context".to_owned(),
            "Deferrable?".to_owned(),
        ];
        let mut widths = [0usize; 6];
        for row in std::iter::once(&header).chain(rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }
        let format_row = |row: &[String; 6]| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
                .collect::<Vec<String>>()
                .join(" | ")
        };
        let mut out = String::new();
        out.push_str(&format_row(&header));
        out.push('\n');
        if truncated {
            out.push_str("...\n");
        }
        for row in &rows {
            out.push_str(&format_row(row));
            out.push('\n');
        }
        out.push_str(&format!("(in graph {})", self.graph_name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_ids::ClassIds;
    use crate::type_data::TypeData;

    fn key(name: &str) -> ContextualTypeKey {
        ContextualTypeKey::from_type(&TypeData::new(name), None, false, &ClassIds::default())
    }

    #[test]
    fn entries_since_returns_cycle_segment() {
        let mut stack = BindingStack::new("AppGraph");
        stack.push(BindingStackEntry::requested_at(key("com/example/A"), "a()"));
        stack.push(BindingStackEntry::injected_at(key("com/example/B"), "A", "b"));
        stack.push(BindingStackEntry::injected_at(key("com/example/C"), "B", "c"));
        let since = stack.entries_since(key("com/example/B").type_key());
        assert_eq!(since.len(), 2);
        assert_eq!(since[0].display_key(), "B");
    }

    #[test]
    fn render_has_header_and_footer() {
        let mut stack = BindingStack::new("AppGraph");
        stack.push(BindingStackEntry::requested_at(key("com/example/A"), "a()"));
        let rendered = stack.render(16);
        assert!(rendered.starts_with("Index"));
        assert!(rendered.contains("Deferrable?"));
        assert!(rendered.ends_with("(in graph AppGraph)"));
    }

    #[test]
    fn render_truncates_with_ellipsis() {
        let mut stack = BindingStack::new("AppGraph");
        for i in 0..10 {
            stack.push(BindingStackEntry::requested_at(
                key(&format!("com/example/T{}", i)),
                "root()",
            ));
        }
        let rendered = stack.render(3);
        assert!(rendered.contains("...\n"));
        assert!(!rendered.contains("T0 "));
    }
}
