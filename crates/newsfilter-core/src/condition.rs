//! Condition atoms
//!
//! A [`ConditionAtom`] is the stored form: symbolic field, operator token and
//! literal value. [`ConditionAtom::compile`] resolves it against the field
//! catalog into a [`Condition`], which can be matched directly or translated
//! for either backend.

use crate::error::Result;
use crate::field::{FieldAccessor, FieldCatalog};
use crate::operator::OperatorKind;
use crate::value::{FilterValue, Scalar};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Stored (field, operator, value) unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionAtom {
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Unique display name
    #[serde(default)]
    pub name: String,

    pub field: String,

    /// Operator token (`in`, `nin`, `like`, ...)
    pub operator: String,

    /// Literal value, comma separated for list operators
    pub value: String,
}

impl ConditionAtom {
    pub fn new(
        id: impl Into<String>,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Resolve field, operator and value against the catalog.
    ///
    /// With `strict_operators` an unrecognised operator token is an error
    /// instead of degrading to the generic pattern operator.
    pub fn compile(&self, catalog: &FieldCatalog, strict_operators: bool) -> Result<Condition> {
        let field = catalog.resolve(&self.field)?;
        let operator = if strict_operators {
            self.operator.parse::<OperatorKind>()?
        } else {
            OperatorKind::resolve(&self.operator)
        };
        let value = FilterValue::parse(&self.field, &self.value, operator, field.value_type())?;

        Ok(Condition {
            atom_id: self.id.clone(),
            field,
            operator,
            value,
        })
    }
}

/// A compiled condition, ready for matching and query generation
#[derive(Debug, Clone)]
pub struct Condition {
    atom_id: String,
    field: FieldAccessor,
    operator: OperatorKind,
    value: FilterValue,
}

impl Condition {
    pub fn atom_id(&self) -> &str {
        &self.atom_id
    }

    pub fn field(&self) -> &FieldAccessor {
        &self.field
    }

    pub fn operator(&self) -> OperatorKind {
        self.operator
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    /// Direct match against one document.
    ///
    /// A missing field matches only for negating operators, or for `eq`
    /// against a falsy literal (`no`, `false`, `f`, `0`).
    pub fn does_match(&self, doc: &Json, now: DateTime<Utc>) -> bool {
        if !self.field.is_present(doc) {
            return self.matches_absent();
        }
        match self.field.extract(doc, now) {
            Some(value) => self.operator.matches(&value, &self.value),
            None => self.matches_absent(),
        }
    }

    fn matches_absent(&self) -> bool {
        self.operator.is_negating()
            || (self.operator == OperatorKind::Eq && Scalar::is_falsy(self.value.literal()))
    }

    /// Document-store fragment
    pub fn to_store_query(&self, now: DateTime<Utc>) -> Json {
        self.field
            .dedicated_store_fragment(self.operator, &self.value, now)
            .unwrap_or_else(|| {
                self.operator
                    .to_store_fragment(self.field.entity_path(), self.value.to_store_value())
            })
    }

    /// Search-backend fragment (positive form, see [`Condition::contains_negation`])
    pub fn to_search_query(&self) -> Json {
        self.field
            .dedicated_search_fragment(self.operator, &self.value)
            .unwrap_or_else(|| {
                let path = self.field.entity_path();
                self.operator
                    .to_search_fragment(path, self.value.to_search_value(path))
            })
    }

    pub fn contains_negation(&self) -> bool {
        self.operator.is_negating()
    }
}
