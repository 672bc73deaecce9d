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

//! Scope-indexed contribution discovery and merging.
//!
//! Discovery caches are shared across graph resolutions and may be hit from
//! parallel compilations, so they sit behind mutexes and are computed once
//! per scope.

use crate::annotation::AnnotationData;
use crate::class_ids::ClassIds;
use crate::declarations::{DeclarationIndex, Visibility};
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticReporter};
use crate::keys::TypeKey;
use crate::resolver::ResolverOptions;
use crate::type_data::{ClassId, TypeData};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// A contribution surviving the merge, with its driving annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub class_id: ClassId,
    pub annotation: AnnotationData,
}

impl Contribution {
    pub fn replaces(&self) -> Vec<ClassId> {
        self.annotation.class_list_value("replaces")
    }

    pub fn rank(&self) -> i64 {
        self.annotation.int_value("rank").unwrap_or(0)
    }

    pub fn explicit_bound_type(&self) -> Option<ClassId> {
        self.annotation.class_value("boundType").cloned()
    }

    pub fn is_binding(&self, class_ids: &ClassIds) -> bool {
        self.annotation.class_id.eq(&class_ids.contributes_binding)
    }
}

#[derive(Debug, Default)]
pub struct ContributionMerger {
    in_compilation_cache: Mutex<HashMap<ClassId, Vec<Contribution>>>,
    hint_cache: Mutex<HashMap<ClassId, Vec<Contribution>>>,
}

impl ContributionMerger {
    pub fn new() -> Self {
        Default::default()
    }

    /// Contributions declared by the compilation currently running, for
    /// `scope`. Classpath contributions arrive through hints instead.
    fn in_compilation(
        &self,
        index: &DeclarationIndex,
        class_ids: &ClassIds,
        scope: &ClassId,
    ) -> Vec<Contribution> {
        let mut cache = self.in_compilation_cache.lock();
        if let Some(found) = cache.get(scope) {
            return found.clone();
        }
        let mut result = Vec::new();
        for class in index.classes() {
            if class.module_name != index.current_module() {
                continue;
            }
            for annotation in &class.annotations {
                let is_contribution = annotation.class_id.eq(&class_ids.contributes_to)
                    || annotation.class_id.eq(&class_ids.contributes_binding);
                if !is_contribution {
                    continue;
                }
                if annotation.class_value("scope") == Some(scope) {
                    result.push(Contribution {
                        class_id: class.class_id.clone(),
                        annotation: annotation.clone(),
                    });
                }
            }
        }
        cache.insert(scope.clone(), result.clone());
        result
    }

    /// Contributions surfaced through generated hint declarations. Internal
    /// classes from other modules are not visible and are filtered out.
    fn hinted(
        &self,
        index: &DeclarationIndex,
        class_ids: &ClassIds,
        scope: &ClassId,
    ) -> Vec<Contribution> {
        let mut cache = self.hint_cache.lock();
        if let Some(found) = cache.get(scope) {
            return found.clone();
        }
        let mut result = Vec::new();
        for class_id in index.hinted_contributions(scope) {
            let class = match index.class(class_id) {
                Some(class) => class,
                None => continue,
            };
            if class.visibility == Visibility::Internal
                && class.module_name != index.current_module()
            {
                continue;
            }
            let annotation = class.annotations.iter().find(|annotation| {
                (annotation.class_id.eq(&class_ids.contributes_to)
                    || annotation.class_id.eq(&class_ids.contributes_binding))
                    && annotation.class_value("scope") == Some(scope)
            });
            if let Some(annotation) = annotation {
                result.push(Contribution {
                    class_id: class.class_id.clone(),
                    annotation: annotation.clone(),
                });
            }
        }
        cache.insert(scope.clone(), result.clone());
        result
    }

    /// Runs the full merge pipeline for the graph's aggregation scopes.
    pub fn merged_contributions(
        &self,
        index: &DeclarationIndex,
        class_ids: &ClassIds,
        options: &ResolverOptions,
        reporter: &dyn DiagnosticReporter,
        scopes: &[ClassId],
        excludes: &[ClassId],
        binding_containers: &BTreeSet<ClassId>,
    ) -> Vec<Contribution> {
        // Collect and deduplicate across compilation and classpath hints.
        let mut by_class: BTreeMap<ClassId, Contribution> = BTreeMap::new();
        for scope in scopes {
            for contribution in self
                .in_compilation(index, class_ids, scope)
                .into_iter()
                .chain(self.hinted(index, class_ids, scope))
            {
                by_class
                    .entry(contribution.class_id.clone())
                    .or_insert(contribution);
            }
        }
        // BTreeMap iteration is the stable full-class-name order.
        let mut contributions: Vec<Contribution> = by_class.into_values().collect();

        let mut unmatched: Vec<ClassId> = Vec::new();

        // Graph-level excludes.
        for exclude in excludes {
            let before = contributions.len();
            contributions.retain(|c| c.class_id.ne(exclude));
            if contributions.len() == before {
                unmatched.push(exclude.clone());
            }
        }

        // Replacements declared by the surviving contributions.
        let replaced: BTreeSet<ClassId> = contributions
            .iter()
            .flat_map(|c| c.replaces())
            .collect();
        for replace in &replaced {
            if !contributions.iter().any(|c| c.class_id.eq(replace)) {
                unmatched.push(replace.clone());
            }
        }
        contributions.retain(|c| !replaced.contains(&c.class_id));

        // Replacements carried by included binding containers, transitively
        // through containers that replace containers.
        let mut container_queue: Vec<ClassId> = binding_containers.iter().cloned().collect();
        let mut seen_containers = BTreeSet::new();
        while let Some(container) = container_queue.pop() {
            if !seen_containers.insert(container.clone()) {
                continue;
            }
            let container_replaces = index
                .class(&container)
                .and_then(|c| c.annotation(&class_ids.binding_container))
                .map(|a| a.class_list_value("replaces"))
                .unwrap_or_default();
            for replace in container_replaces {
                contributions.retain(|c| c.class_id.ne(&replace));
                container_queue.push(replace);
            }
        }

        if options.rank_interop_enabled {
            contributions = self.retain_max_rank(index, class_ids, contributions);
        }

        if options.warn_on_unmatched_removals {
            for class_id in unmatched {
                reporter.warning(&Diagnostic::new(
                    DiagnosticCode::AggregationError,
                    format!(
                        "exclusion or replacement {} did not match any contribution",
                        class_id.dotted()
                    ),
                ));
            }
        }

        debug!(
            scopes = scopes.len(),
            merged = contributions.len(),
            "merged contributions"
        );
        contributions
    }

    /// Groups binding contributions by bound type key; only maximum-rank
    /// members of each group survive.
    fn retain_max_rank(
        &self,
        index: &DeclarationIndex,
        class_ids: &ClassIds,
        contributions: Vec<Contribution>,
    ) -> Vec<Contribution> {
        let mut max_rank: BTreeMap<TypeKey, i64> = BTreeMap::new();
        for contribution in &contributions {
            if !contribution.is_binding(class_ids) {
                continue;
            }
            if let Some(key) = self.bound_type_key(index, class_ids, contribution) {
                let entry = max_rank.entry(key).or_insert(i64::MIN);
                *entry = (*entry).max(contribution.rank());
            }
        }
        contributions
            .into_iter()
            .filter(|contribution| {
                if !contribution.is_binding(class_ids) {
                    return true;
                }
                match self.bound_type_key(index, class_ids, contribution) {
                    Some(key) => max_rank
                        .get(&key)
                        .map(|max| contribution.rank() >= *max)
                        .unwrap_or(true),
                    None => true,
                }
            })
            .collect()
    }

    /// The type key a binding contribution binds: the explicit bound type,
    /// or the contribution's sole direct supertype.
    pub fn bound_type_key(
        &self,
        index: &DeclarationIndex,
        class_ids: &ClassIds,
        contribution: &Contribution,
    ) -> Option<TypeKey> {
        let bound_class = contribution.explicit_bound_type().or_else(|| {
            let class = index.class(&contribution.class_id)?;
            if class.supertypes.len() == 1 {
                Some(class.supertypes[0].class_id.clone())
            } else {
                None
            }
        })?;
        let qualifier = index
            .class(&contribution.class_id)
            .and_then(|class| index.qualifier_annotation(&class.annotations, class_ids));
        Some(TypeKey::new(TypeData::new(bound_class), qualifier))
    }
}
