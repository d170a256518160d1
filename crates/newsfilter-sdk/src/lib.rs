//! Newsfilter SDK
//!
//! High-level API for managing filter conditions and content filters and for
//! compiling and evaluating them.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;

// Re-export main types
pub use builder::FilterEngineBuilder;
pub use catalog::CatalogHandle;
pub use crate::config::{CatalogConfig, EngineConfig};
pub use engine::FilterEngine;
pub use error::{Result, SdkError};
pub use telemetry::init_tracing;

// Re-export commonly used types from dependencies
pub use newsfilter_compiler::{CompilerOptions, MatchMode};
pub use newsfilter_core::{
    ConditionAtom, Document, FieldCapability, FilterExpression, FilterGroup, Vocabulary,
    VocabularyEvent, VocabularyItem,
};
pub use newsfilter_repository::{
    ConsumerLookup, MemoryConsumers, MemoryRepository, Product, RoutingScheme, Subscriber,
};
