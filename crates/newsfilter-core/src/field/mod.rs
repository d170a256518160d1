//! Filterable fields
//!
//! A symbolic field name (`urgency`, `genre`, `desk`, a vocabulary id, ...)
//! resolves through the [`FieldCatalog`] to a [`FieldAccessor`] that knows the
//! backend-addressable entity path, the value type, how to test presence and
//! how to extract the value from a document.
//!
//! Dispatch is by [`FieldKind`]:
//! - `Path`: plain entity path, arrays of sub-documents are flattened
//! - `Html`: like `Path`, but text is reduced from HTML before matching
//! - `Embargo` / `FeatureMedia`: computed boolean fields with dedicated
//!   backend fragments
//! - `Vocabulary`: controlled-vocabulary field scoped to `subject` entries of
//!   one scheme

mod accessor;
mod catalog;

pub use accessor::FieldAccessor;
pub use catalog::{FieldCapability, FieldCatalog, Vocabulary, VocabularyEvent, VocabularyItem};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

/// How a field is read and translated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Path,
    Html,
    Embargo,
    FeatureMedia,
    Vocabulary { scheme: String },
}

impl FieldKind {
    /// Computed fields bypass the generic path + operator translation
    pub fn is_computed(&self) -> bool {
        matches!(self, FieldKind::Embargo | FieldKind::FeatureMedia)
    }
}

/// Value type literals are coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    Bool,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => f.write_str("an integer"),
            ValueType::Bool => f.write_str("a boolean"),
            ValueType::String => f.write_str("a string"),
        }
    }
}

/// Value extracted from a document
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Single(Json),
    Many(Vec<Json>),
}
