//! Error types for scc-lint.
//!
//! Every variant here is fatal for the run and maps to exit code 2. Problems
//! found while evaluating rules are not errors; they become findings in the
//! report (see [`crate::analyzer::scclint::rules::RuleEvaluationError`]).

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a check before any rule is evaluated.
#[derive(Debug, Error)]
pub enum SccLintError {
    /// An input file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML/JSON syntax.
    #[error("{location}: malformed document: {message}")]
    Parse { location: String, message: String },

    /// A required field is missing or has the wrong type.
    #[error("{}: schema error at `{field}`: {message}", .path.display())]
    Schema {
        path: PathBuf,
        field: String,
        message: String,
    },

    /// The document kind is not the one the caller asked for.
    #[error("{}: unsupported kind `{found}` (expected {expected})", .path.display())]
    UnsupportedKind {
        path: PathBuf,
        found: String,
        expected: String,
    },

    /// The configuration file is invalid.
    #[error("invalid configuration {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// A batch definition file is invalid.
    #[error("invalid batch definition {}: {message}", .path.display())]
    Batch { path: PathBuf, message: String },

    /// Command-line arguments that clap cannot express as constraints.
    #[error("{0}")]
    Usage(String),

    /// The worker pool or a background task failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SccLintError {
    /// Build a parse error, attaching the line number when it is known.
    pub fn parse(path: &Path, line: Option<u32>, message: impl Into<String>) -> Self {
        let location = match line {
            Some(line) => format!("{}:{}", path.display(), line),
            None => path.display().to_string(),
        };
        Self::Parse {
            location,
            message: message.into(),
        }
    }

    pub fn schema(path: &Path, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.to_path_buf(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, SccLintError>;
