//! Compiler error types

use newsfilter_core::CoreError;
use std::fmt;
use thiserror::Error;

/// What a dangling reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Atom,
    Filter,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Atom => f.write_str("filter condition"),
            ReferenceKind::Filter => f.write_str("content filter"),
        }
    }
}

/// Compiler error
#[derive(Error, Debug)]
pub enum CompileError {
    /// A filter reaches itself through nested references
    #[error("Circular dependency in content filter '{filter_id}': {}", .path.join(" -> "))]
    CircularReference { filter_id: String, path: Vec<String> },

    /// A referenced atom or nested filter does not exist
    #[error("{kind} '{id}' referenced from '{referenced_from}' does not exist")]
    DanglingReference {
        kind: ReferenceKind,
        id: String,
        referenced_from: String,
    },

    #[error("Content filter '{filter_id}' has no statements")]
    EmptyFilter { filter_id: String },

    /// `index` is 1-based
    #[error("Filter statement {index} of content filter '{filter_id}' does not have a filter condition")]
    EmptyGroup { filter_id: String, index: usize },

    #[error("Content filter '{filter_id}' nests deeper than {limit} levels")]
    DepthExceeded { filter_id: String, limit: usize },

    /// Direct matching failed on a malformed stored atom
    #[error("Error evaluating content filter '{filter_id}' against document '{document_id}': {source}")]
    Evaluation {
        filter_id: String,
        document_id: String,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;
