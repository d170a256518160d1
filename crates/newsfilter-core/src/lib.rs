//! Newsfilter Core - Core types for the content filter engine
//!
//! This crate provides the building blocks shared by the compiler, the
//! repository layer and the SDK:
//! - Field catalog and per-field accessors
//! - Operator semantics
//! - Literal value coercion
//! - Condition atoms and stored filter expressions
//! - Error types

pub mod condition;
pub mod error;
pub mod field;
pub mod filter;
pub mod operator;
pub mod value;

// Re-export commonly used types
pub use condition::{Condition, ConditionAtom};
pub use error::{CoreError, Result};
pub use field::{
    FieldAccessor, FieldCapability, FieldCatalog, FieldKind, FieldValue, ValueType, Vocabulary,
    VocabularyEvent, VocabularyItem,
};
pub use filter::{FilterExpression, FilterGroup, GroupExpression};
pub use operator::{OperatorFamily, OperatorKind};
pub use value::{FilterValue, Scalar};

/// Document shape consumed by direct matching (a news item as stored JSON).
pub type Document = serde_json::Value;

/// Identifier of the document used in diagnostics (`_id`, falling back to `guid`).
pub fn document_id(doc: &Document) -> String {
    doc.get("_id")
        .or_else(|| doc.get("guid"))
        .map(|id| match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "<unknown>".to_string())
}
