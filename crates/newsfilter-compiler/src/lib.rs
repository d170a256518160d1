//! Newsfilter Compiler - content filter compilation and evaluation
//!
//! A content filter is compiled from a [`FilterGraph`], an arena holding the
//! filter, every nested filter it reaches and every condition atom they
//! reference. From one graph the [`FilterCompiler`] produces:
//! - a document-store query
//! - a search-backend query, in matching or not-matching mode
//! - a direct match decision for a single document

pub mod compiler;
pub mod error;
pub mod graph;
pub mod validator;

// Re-export main types
pub use compiler::{CompilerOptions, FilterCompiler, MatchMode, DEFAULT_MAX_DEPTH, SPIKED_STATE};
pub use error::{CompileError, ReferenceKind, Result};
pub use graph::FilterGraph;
pub use validator::{validate_acyclic, validate_filter, validate_references_resolvable, validate_structure};
