//! Error types and result aliases for terraspec.
//!
//! Syntax and engine failures are variants of [`SpecError`], rendered via `miette`
//! diagnostics. Spec-authoring and value mismatches are not errors in this sense:
//! they are report [`crate::diagnostics::Diagnostic`]s.

use miette::{Diagnostic, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

use crate::lexer::token::SourceLocation;

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(a_len + 1) {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate().take(b_len + 1) {
        *val = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}

/// Find the best "did you mean?" suggestion from a list of candidates
pub fn find_similar<S: AsRef<str>>(name: &str, candidates: &[S], max_distance: usize) -> Option<String> {
    let name_lower = name.to_lowercase();
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let candidate = candidate.as_ref();
        let distance = levenshtein_distance(&name_lower, &candidate.to_lowercase());

        if distance <= max_distance && distance < best_distance {
            best_distance = distance;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Suffix for an "unknown name" message: ` (did you mean 'x'?)` or nothing.
pub fn did_you_mean<S: AsRef<str>>(name: &str, candidates: &[S]) -> String {
    // Longer names tolerate more typos
    let max_distance = (name.len() / 3).clamp(2, 3);
    match find_similar(name, candidates, max_distance) {
        Some(suggestion) => format!(" (did you mean '{}'?)", suggestion),
        None => String::new(),
    }
}

/// Main error type for terraspec
#[derive(Error, Debug, Diagnostic)]
pub enum SpecError {
    #[error("unexpected token")]
    #[diagnostic(code(T0001), help("{help}"))]
    UnexpectedToken {
        #[source_code]
        src: String,
        #[label("expected {expected}, found {found}")]
        span: SourceSpan,
        location: SourceLocation,
        expected: String,
        found: String,
        help: String,
    },

    #[error("unterminated {what}")]
    #[diagnostic(code(T0002), help("{help}"))]
    Unterminated {
        #[source_code]
        src: String,
        #[label("{what} started here but never closed")]
        span: SourceSpan,
        location: SourceLocation,
        what: String,
        help: String,
    },

    #[error("invalid escape sequence")]
    #[diagnostic(code(T0003), help("{help}"))]
    InvalidEscapeSequence {
        #[source_code]
        src: String,
        #[label("invalid escape: {sequence}")]
        span: SourceSpan,
        location: SourceLocation,
        sequence: String,
        help: String,
    },

    #[error("unexpected character")]
    #[diagnostic(code(T0004), help("{help}"))]
    UnexpectedCharacter {
        #[source_code]
        src: String,
        #[label("unexpected: '{ch}'")]
        span: SourceSpan,
        location: SourceLocation,
        ch: char,
        help: String,
    },

    #[error("template expressions are not supported in spec files")]
    #[diagnostic(
        code(T0005),
        help("assertions only accept literal values; write $${{ to keep a literal '${{'")
    )]
    TemplateNotSupported {
        #[source_code]
        src: String,
        #[label("template starts here")]
        span: SourceSpan,
        location: SourceLocation,
    },

    #[error("invalid provider schema: {message}")]
    #[diagnostic(code(T0101))]
    InvalidSchema { message: String },

    #[error("{command} failed: {message}")]
    #[diagnostic(code(T0201))]
    EngineCommand { command: String, message: String },

    #[error("invalid plan document: {message}")]
    #[diagnostic(code(T0202))]
    InvalidPlan { message: String },

    #[error("I/O error: {message}")]
    #[diagnostic(code(T0301))]
    IoError { message: String },
}

impl SpecError {
    /// Create an UnexpectedToken error
    pub fn unexpected_token(
        src: impl Into<String>,
        location: &SourceLocation,
        expected: impl Into<String>,
        found: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        SpecError::UnexpectedToken {
            src: src.into(),
            span: (location.offset, location.length).into(),
            location: location.clone(),
            expected: expected.into(),
            found: found.into(),
            help: help.into(),
        }
    }

    /// Create an Unterminated error for a string or heredoc
    pub fn unterminated(
        src: impl Into<String>,
        location: &SourceLocation,
        what: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        SpecError::Unterminated {
            src: src.into(),
            span: (location.offset, location.length).into(),
            location: location.clone(),
            what: what.into(),
            help: help.into(),
        }
    }

    /// Create an InvalidEscapeSequence error
    pub fn invalid_escape_sequence(
        src: impl Into<String>,
        location: &SourceLocation,
        sequence: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        SpecError::InvalidEscapeSequence {
            src: src.into(),
            span: (location.offset, location.length).into(),
            location: location.clone(),
            sequence: sequence.into(),
            help: help.into(),
        }
    }

    /// Create an UnexpectedCharacter error
    pub fn unexpected_character(
        src: impl Into<String>,
        location: &SourceLocation,
        ch: char,
    ) -> Self {
        let help = if ch == ';' {
            "spec files do not use semicolons, use newlines to separate attributes".to_string()
        } else if ch == '`' {
            "use double quotes \"...\" for strings".to_string()
        } else if ch == '\'' {
            "strings are written with double quotes".to_string()
        } else {
            format!("'{}' is not valid spec syntax", ch)
        };
        SpecError::UnexpectedCharacter {
            src: src.into(),
            span: (location.offset, location.length).into(),
            location: location.clone(),
            ch,
            help,
        }
    }

    /// Create a TemplateNotSupported error
    pub fn template_not_supported(src: impl Into<String>, location: &SourceLocation) -> Self {
        SpecError::TemplateNotSupported {
            src: src.into(),
            span: (location.offset, location.length).into(),
            location: location.clone(),
        }
    }

    /// Create an IoError
    pub fn io_error(message: impl Into<String>) -> Self {
        SpecError::IoError {
            message: message.into(),
        }
    }

    /// Create an EngineCommand error
    pub fn engine_command(command: impl Into<String>, message: impl Into<String>) -> Self {
        SpecError::EngineCommand {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidPlan error
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        SpecError::InvalidPlan {
            message: message.into(),
        }
    }

    /// Create an InvalidSchema error
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        SpecError::InvalidSchema {
            message: message.into(),
        }
    }

    /// Source location of a syntax error
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            SpecError::UnexpectedToken { location, .. }
            | SpecError::Unterminated { location, .. }
            | SpecError::InvalidEscapeSequence { location, .. }
            | SpecError::UnexpectedCharacter { location, .. }
            | SpecError::TemplateNotSupported { location, .. } => Some(location),
            SpecError::InvalidSchema { .. }
            | SpecError::EngineCommand { .. }
            | SpecError::InvalidPlan { .. }
            | SpecError::IoError { .. } => None,
        }
    }

    /// Get a simple error message (without source context)
    pub fn message(&self) -> String {
        match self {
            SpecError::UnexpectedToken {
                expected, found, ..
            } => {
                format!("unexpected token: expected {}, found {}", expected, found)
            }
            SpecError::Unterminated { what, .. } => format!("unterminated {}", what),
            SpecError::InvalidEscapeSequence { sequence, .. } => {
                format!("invalid escape sequence: {}", sequence)
            }
            SpecError::UnexpectedCharacter { ch, .. } => {
                format!("unexpected character: '{}'", ch)
            }
            SpecError::TemplateNotSupported { .. } => {
                "template expressions are not supported in spec files".to_string()
            }
            SpecError::InvalidSchema { message } => format!("invalid provider schema: {}", message),
            SpecError::EngineCommand { command, message } => {
                format!("{} failed: {}", command, message)
            }
            SpecError::InvalidPlan { message } => format!("invalid plan document: {}", message),
            SpecError::IoError { message } => format!("I/O error: {}", message),
        }
    }
}

/// Result type for terraspec operations
pub type SpecResult<T> = Result<T, SpecError>;

/// Failures that abort a whole run rather than a single test case
#[derive(Error, Debug, Diagnostic)]
pub enum RunError {
    #[error("cannot read spec directory {}", path.display())]
    #[diagnostic(code(T0301), help("pass the folder holding the test cases with --spec"))]
    SpecDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no test case found in {}", path.display())]
    #[diagnostic(
        code(T0302),
        help("a test case is a directory containing a .tfspec file and an optional .tfvars file")
    )]
    NoCases { path: PathBuf },

    #[error("test case {case} did not complete: {message}")]
    #[diagnostic(code(T0303))]
    Task { case: String, message: String },
}
