//! Report diagnostics: the uniform outcome of every check, parse and engine call.

use std::fmt;

use crate::errors::SpecError;
use crate::lexer::token::SourceLocation;
use crate::value::AttributePath;

/// How bad a diagnostic is. Only `Error` fails a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One validation, parse or engine outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Short headline; empty for assertion diagnostics
    pub summary: String,
    pub detail: String,
    /// Position inside the asserted value, for matcher diagnostics
    pub path: Option<AttributePath>,
    /// Position in a source file, for parse and engine diagnostics
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(severity: Severity, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: detail.into(),
            path: None,
            location: None,
        }
    }

    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary, detail)
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Warning, summary, detail)
    }

    /// Matched leaf at `path`; the detail is the actual value
    pub fn matched(path: AttributePath, actual: impl fmt::Display) -> Self {
        Self::new(Severity::Info, "", actual.to_string()).with_path(path)
    }

    /// Failed check at `path`
    pub fn mismatch(path: AttributePath, detail: impl Into<String>) -> Self {
        Self::new(Severity::Error, "", detail).with_path(path)
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_path(mut self, path: AttributePath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&SpecError> for Diagnostic {
    fn from(err: &SpecError) -> Self {
        if let Some(location) = err.location() {
            return Diagnostic::error("Invalid spec file", err.message())
                .with_location(location.clone());
        }
        let summary = match err {
            SpecError::InvalidSchema { .. } => "Invalid provider schema",
            SpecError::EngineCommand { .. } => "Engine command failed",
            SpecError::InvalidPlan { .. } => "Invalid plan",
            _ => "I/O failure",
        };
        Diagnostic::error(summary, err.message())
    }
}

impl From<SpecError> for Diagnostic {
    fn from(err: SpecError) -> Self {
        Diagnostic::from(&err)
    }
}

/// Whether any diagnostic is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_errors() {
        let mut diags = vec![
            Diagnostic::matched(AttributePath::root().attr("ami"), "\"ami-123\""),
            Diagnostic::warning("Unused mock", "data.aws_ami.x"),
        ];
        assert!(!has_errors(&diags));
        diags.push(Diagnostic::mismatch(AttributePath::root(), "nope"));
        assert!(has_errors(&diags));
    }

    #[test]
    fn test_matched_detail_is_actual_value() {
        let diag = Diagnostic::matched(AttributePath::root().attr("port"), 8080);
        assert_eq!(diag.severity, Severity::Info);
        assert_eq!(diag.detail, "8080");
        assert_eq!(diag.path.map(|p| p.to_string()), Some("port".to_string()));
    }

    #[test]
    fn test_from_syntax_error_keeps_location() {
        let loc = SourceLocation::new(Some("web.tfspec".into()), 4, 9, 40, 1);
        let err = SpecError::unexpected_character("", &loc, ';');
        let diag = Diagnostic::from(&err);
        assert!(diag.is_error());
        assert_eq!(diag.location.map(|l| l.line), Some(4));
        assert!(diag.path.is_none());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
