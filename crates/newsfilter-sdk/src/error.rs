//! SDK error types

use newsfilter_compiler::CompileError;
use newsfilter_core::CoreError;
use newsfilter_repository::RepositoryError;
use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Storage, validation or delete-guard failure
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Compiler error
    #[error("Compiler error: {0}")]
    Compile(#[from] CompileError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Content filter not found: {0}")]
    FilterNotFound(String),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
