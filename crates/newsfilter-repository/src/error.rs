//! Error types for the repository layer

use newsfilter_compiler::{CompileError, ReferenceKind};
use newsfilter_core::CoreError;
use std::fmt;
use thiserror::Error;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Kind of consumer holding a reference to a content filter or atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConsumerKind {
    Subscriber,
    RoutingScheme,
    ContentFilter,
}

impl fmt::Display for ConsumerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerKind::Subscriber => f.write_str("subscriber"),
            ConsumerKind::RoutingScheme => f.write_str("routing scheme"),
            ConsumerKind::ContentFilter => f.write_str("content filter"),
        }
    }
}

/// One consumer still referencing an entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reference {
    pub consumer: ConsumerKind,
    pub name: String,
}

impl Reference {
    pub fn new(consumer: ConsumerKind, name: impl Into<String>) -> Self {
        Self {
            consumer,
            name: name.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.consumer, self.name)
    }
}

fn join(references: &[Reference]) -> String {
    references
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur during repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ReferenceKind, id: String },

    /// Same field, operator and (order-insensitive) value as an existing atom
    #[error("Filter condition already exists: {existing}")]
    DuplicateAtom { existing: String },

    #[error("{kind} name is already used: {name}")]
    DuplicateName { kind: ReferenceKind, name: String },

    /// Delete refused while consumers still reference the entity
    #[error("{kind} '{id}' is referenced by {}", join(.references))]
    InUse {
        kind: ReferenceKind,
        id: String,
        references: Vec<Reference>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
