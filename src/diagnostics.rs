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

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Source location reported by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new<S: Into<String>>(file: S, line: u32) -> Self {
        Location {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    MissingBinding,
    DuplicateBinding,
    DependencyCycle,
    IncompatiblyScopedBindings,
    MultibindsError,
    ProvidesError,
    BindsError,
    AggregationError,
    ProviderOverrides,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MissingBinding => "MissingBinding",
            DiagnosticCode::DuplicateBinding => "DuplicateBinding",
            DiagnosticCode::DependencyCycle => "DependencyCycle",
            DiagnosticCode::IncompatiblyScopedBindings => "IncompatiblyScopedBindings",
            DiagnosticCode::MultibindsError => "MultibindsError",
            DiagnosticCode::ProvidesError => "ProvidesError",
            DiagnosticCode::BindsError => "BindsError",
            DiagnosticCode::AggregationError => "AggregationError",
            DiagnosticCode::ProviderOverrides => "ProviderOverrides",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured diagnostic. The message already contains any rendered
/// binding stack or cycle diagram; the reporter only delivers it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[Lattice/{code}] {message}")]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(code: DiagnosticCode, message: S) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }
}

/// A diagnostic that aborts processing of the current graph. Other graphs
/// are unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(transparent)]
pub struct FatalDiagnostic(pub Diagnostic);

/// Failure result for the graph under inspection.
#[must_use]
pub fn fail<T, S: Into<String>>(code: DiagnosticCode, message: S) -> Result<T, FatalDiagnostic> {
    Err(FatalDiagnostic(Diagnostic::new(code, message)))
}

#[must_use]
pub fn fail_at<T, S: Into<String>>(
    code: DiagnosticCode,
    message: S,
    location: Option<Location>,
) -> Result<T, FatalDiagnostic> {
    Err(FatalDiagnostic(Diagnostic::new(code, message).at(location)))
}

pub trait DiagnosticReporter {
    fn error(&self, diagnostic: &Diagnostic);
    fn warning(&self, diagnostic: &Diagnostic);
}

/// Collects diagnostics in memory; the reporter used by tests and by hosts
/// that batch delivery.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    errors: Mutex<Vec<Diagnostic>>,
    warnings: Mutex<Vec<Diagnostic>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn errors(&self) -> Vec<Diagnostic> {
        self.errors.lock().clone()
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.warnings.lock().clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.lock().is_empty()
    }
}

impl DiagnosticReporter for CollectingReporter {
    fn error(&self, diagnostic: &Diagnostic) {
        self.errors.lock().push(diagnostic.clone());
    }

    fn warning(&self, diagnostic: &Diagnostic) {
        self.warnings.lock().push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_with_code_prefix() {
        let diagnostic = Diagnostic::new(DiagnosticCode::MissingBinding, "no binding for std.String");
        assert_eq!(
            diagnostic.to_string(),
            "[Lattice/MissingBinding] no binding for std.String"
        );
    }

    #[test]
    fn collecting_reporter_keeps_order() {
        let reporter = CollectingReporter::new();
        reporter.error(&Diagnostic::new(DiagnosticCode::DependencyCycle, "a"));
        reporter.error(&Diagnostic::new(DiagnosticCode::MissingBinding, "b"));
        let errors = reporter.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code, DiagnosticCode::DependencyCycle);
        assert_eq!(errors[1].code, DiagnosticCode::MissingBinding);
    }
}
