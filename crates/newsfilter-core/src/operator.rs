//! Operators for filter conditions
//!
//! An operator knows three things: how to decide a match against a value
//! extracted from a document, which token/clause it maps to in each backend,
//! and whether it negates (which drives `must`/`must_not` placement when a
//! filter is compiled for the search backend).

use crate::error::{CoreError, Result};
use crate::field::FieldValue;
use crate::value::{fold, text_of, FilterValue, Scalar, SearchValue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    // Membership operators
    /// Value is one of the listed values
    #[serde(rename = "in")]
    In,
    /// Value is none of the listed values
    #[serde(rename = "nin")]
    NotIn,

    // Pattern operators
    /// Substring
    #[serde(rename = "like")]
    Like,
    /// Does not contain substring
    #[serde(rename = "notlike")]
    NotLike,
    /// Prefix
    #[serde(rename = "startswith")]
    StartsWith,
    /// Suffix
    #[serde(rename = "endswith")]
    EndsWith,

    /// Full-text match, delegated to the search backend
    #[serde(rename = "match")]
    Match,

    // Comparison operators
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "ne")]
    Ne,
    #[serde(rename = "gt")]
    Gt,
    #[serde(rename = "gte")]
    Gte,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "lte")]
    Lte,
}

/// Operator family, decides how literals are coerced and which clause shape is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorFamily {
    Membership,
    Pattern,
    FullText,
    Comparison,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 13] = [
        OperatorKind::In,
        OperatorKind::NotIn,
        OperatorKind::Like,
        OperatorKind::NotLike,
        OperatorKind::StartsWith,
        OperatorKind::EndsWith,
        OperatorKind::Match,
        OperatorKind::Eq,
        OperatorKind::Ne,
        OperatorKind::Gt,
        OperatorKind::Gte,
        OperatorKind::Lt,
        OperatorKind::Lte,
    ];

    /// Resolve an operator token.
    ///
    /// Unrecognised tokens degrade to the generic pattern operator (substring
    /// match) instead of failing. Use [`OperatorKind::from_str`] for the strict
    /// variant.
    pub fn resolve(token: &str) -> OperatorKind {
        match token.parse() {
            Ok(kind) => kind,
            Err(_) => {
                tracing::warn!(
                    "Unrecognised operator '{}', falling back to pattern operator",
                    token
                );
                OperatorKind::Like
            }
        }
    }

    /// Symbolic token as stored on a condition
    pub fn token(&self) -> &'static str {
        match self {
            OperatorKind::In => "in",
            OperatorKind::NotIn => "nin",
            OperatorKind::Like => "like",
            OperatorKind::NotLike => "notlike",
            OperatorKind::StartsWith => "startswith",
            OperatorKind::EndsWith => "endswith",
            OperatorKind::Match => "match",
            OperatorKind::Eq => "eq",
            OperatorKind::Ne => "ne",
            OperatorKind::Gt => "gt",
            OperatorKind::Gte => "gte",
            OperatorKind::Lt => "lt",
            OperatorKind::Lte => "lte",
        }
    }

    pub fn family(&self) -> OperatorFamily {
        match self {
            OperatorKind::In | OperatorKind::NotIn => OperatorFamily::Membership,
            OperatorKind::Like
            | OperatorKind::NotLike
            | OperatorKind::StartsWith
            | OperatorKind::EndsWith => OperatorFamily::Pattern,
            OperatorKind::Match => OperatorFamily::FullText,
            OperatorKind::Eq
            | OperatorKind::Ne
            | OperatorKind::Gt
            | OperatorKind::Gte
            | OperatorKind::Lt
            | OperatorKind::Lte => OperatorFamily::Comparison,
        }
    }

    /// Returns true if this operator negates its clause
    pub fn is_negating(&self) -> bool {
        matches!(
            self,
            OperatorKind::NotIn | OperatorKind::NotLike | OperatorKind::Ne
        )
    }

    /// The non-negated counterpart (identity for positive operators)
    pub fn positive(&self) -> OperatorKind {
        match self {
            OperatorKind::NotIn => OperatorKind::In,
            OperatorKind::NotLike => OperatorKind::Like,
            OperatorKind::Ne => OperatorKind::Eq,
            other => *other,
        }
    }

    /// Document-store operator token
    pub fn store_token(&self) -> &'static str {
        match self {
            OperatorKind::In | OperatorKind::Match => "$in",
            OperatorKind::NotIn => "$nin",
            OperatorKind::Like | OperatorKind::StartsWith | OperatorKind::EndsWith => "$regex",
            OperatorKind::NotLike => "$not",
            OperatorKind::Eq => "$eq",
            OperatorKind::Ne => "$ne",
            OperatorKind::Gt => "$gt",
            OperatorKind::Gte => "$gte",
            OperatorKind::Lt => "$lt",
            OperatorKind::Lte => "$lte",
        }
    }

    /// Search-backend clause name
    pub fn search_clause(&self) -> &'static str {
        match self.family() {
            OperatorFamily::Membership => "terms",
            OperatorFamily::Pattern | OperatorFamily::FullText => "query_string",
            OperatorFamily::Comparison => match self {
                OperatorKind::Eq | OperatorKind::Ne => "term",
                _ => "range",
            },
        }
    }

    /// Decide whether a value extracted from a document satisfies this operator.
    ///
    /// String comparisons are case-insensitive. For sequence-valued fields a
    /// positive membership matches when ANY element is in the set, while a
    /// negated membership matches only when NO element is.
    pub fn matches(&self, article: &FieldValue, filter: &FilterValue) -> bool {
        match self.family() {
            OperatorFamily::Membership | OperatorFamily::FullText => {
                let Some(set) = filter.folded_list() else {
                    return false;
                };
                let contains = |v: &Json| set.contains(&fold(v));
                match self {
                    OperatorKind::NotIn => match article {
                        FieldValue::Many(values) => values.iter().all(|v| !contains(v)),
                        FieldValue::Single(v) => !contains(v),
                    },
                    _ => match article {
                        FieldValue::Many(values) => values.iter().any(contains),
                        FieldValue::Single(v) => contains(v),
                    },
                }
            }
            OperatorFamily::Pattern => {
                let Some(regex) = filter.regex() else {
                    return false;
                };
                let hit = |v: &Json| regex.is_match(&text_of(v));
                let any_hit = match article {
                    FieldValue::Many(values) => values.iter().any(hit),
                    FieldValue::Single(v) => hit(v),
                };
                if self.is_negating() {
                    !any_hit
                } else {
                    any_hit
                }
            }
            OperatorFamily::Comparison => {
                let Some(expected) = filter.single() else {
                    return false;
                };
                match article {
                    FieldValue::Single(v) => self.compare(v, expected),
                    FieldValue::Many(values) if *self == OperatorKind::Ne => {
                        values.iter().all(|v| self.compare(v, expected))
                    }
                    FieldValue::Many(values) => values.iter().any(|v| self.compare(v, expected)),
                }
            }
        }
    }

    fn compare(&self, article: &Json, expected: &Scalar) -> bool {
        let ordering = match expected {
            Scalar::Bool(b) => {
                let actual = match article {
                    Json::Bool(x) => *x,
                    Json::String(s) => Scalar::is_truthy(s),
                    Json::Number(n) => n.as_f64() == Some(1.0),
                    _ => return false,
                };
                Some(actual.cmp(b))
            }
            Scalar::Int(i) => {
                let actual = match article {
                    Json::Number(n) => n.as_f64(),
                    Json::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match actual {
                    Some(a) => a.partial_cmp(&(*i as f64)),
                    None => return false,
                }
            }
            Scalar::Str(s) => {
                let actual = fold(article);
                Some(actual.trim().cmp(s.to_lowercase().trim()))
            }
        };

        let Some(ordering) = ordering else {
            return false;
        };
        match self {
            OperatorKind::Eq => ordering == Ordering::Equal,
            OperatorKind::Ne => ordering != Ordering::Equal,
            OperatorKind::Gt => ordering == Ordering::Greater,
            OperatorKind::Gte => ordering != Ordering::Less,
            OperatorKind::Lt => ordering == Ordering::Less,
            OperatorKind::Lte => ordering != Ordering::Greater,
            _ => false,
        }
    }

    /// Single-clause document-store fragment for `path`
    pub fn to_store_fragment(&self, path: &str, value: Json) -> Json {
        let condition = match self {
            OperatorKind::Eq => value,
            OperatorKind::Like | OperatorKind::StartsWith | OperatorKind::EndsWith => value,
            _ => json!({ self.store_token(): value }),
        };
        let mut fragment = Map::new();
        fragment.insert(path.to_string(), condition);
        Json::Object(fragment)
    }

    /// Single-clause search-backend fragment for `path`.
    ///
    /// Negated operators produce the same clause as their positive
    /// counterpart; the caller places it under `must_not`.
    pub fn to_search_fragment(&self, path: &str, value: SearchValue) -> Json {
        match (self.family(), value) {
            (OperatorFamily::FullText, SearchValue::QueryString(query)) => json!({
                "query_string": { "query": query, "default_field": path }
            }),
            (_, SearchValue::QueryString(query)) => json!({
                "query_string": { "query": query }
            }),
            (OperatorFamily::Comparison, SearchValue::Typed(value)) => match self {
                OperatorKind::Eq | OperatorKind::Ne => json!({ "term": { path: value } }),
                _ => json!({ "range": { path: { self.range_key(): value } } }),
            },
            (_, SearchValue::Typed(value)) => json!({ self.search_clause(): { path: value } }),
        }
    }

    fn range_key(&self) -> &'static str {
        match self {
            OperatorKind::Gt => "gt",
            OperatorKind::Gte => "gte",
            OperatorKind::Lt => "lt",
            _ => "lte",
        }
    }
}

impl FromStr for OperatorKind {
    type Err = CoreError;

    fn from_str(token: &str) -> Result<Self> {
        OperatorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.token() == token)
            .ok_or_else(|| CoreError::UnknownOperator(token.to_string()))
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
