//! Compile errors
//!
//! Every failure aborts the whole compile run. Multi-issue failures
//! (structural validation, SDL validation) are pre-joined into one message.

use std::path::PathBuf;
use thiserror::Error;

/// A single structural validation issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Slash separated location of the offending value (e.g. `/resolvers/Query.user`)
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    /// The configuration does not match the expected structure
    #[error("{}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// A resolver or pipeline function names a data source that does not exist
    #[error("{owner} references unknown DataSource '{name}'")]
    UnknownDataSource { owner: String, name: String },

    /// A pipeline resolver names a pipeline function that does not exist
    #[error("{owner} references unknown Pipeline function '{name}'")]
    UnknownPipelineFunction { owner: String, name: String },

    /// An entity is missing a field its type requires, or combines exclusive ones
    #[error("{0}")]
    ConfigShape(String),

    /// Structural or merge errors in the GraphQL schema
    #[error("{}", .0.join("\n"))]
    Schema(Vec<String>),

    #[error("Api Key {name} must be valid for a minimum of 1 day and a maximum of 365 days.")]
    ApiKeyExpiry { name: String },

    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    /// A referenced schema, template or code file is not on disk
    #[error("{kind} file '{}' does not exist", .path.display())]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two distinct entities sanitized to the same logical id
    #[error("Logical id '{logical_id}' is generated more than once. Check for names that only differ by non-alphanumeric characters.")]
    LogicalIdCollision { logical_id: String },
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
