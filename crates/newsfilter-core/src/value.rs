//! Literal value coercion
//!
//! A condition stores its value as a plain string. `FilterValue` parses that
//! literal once, according to the field's value type and the operator family:
//! - membership and full-text operators split on commas into a typed list
//! - comparison operators parse a single typed scalar
//! - pattern operators build a case-insensitive regex over the literal text
//!
//! Pattern literals are matched as text on every backend: regex
//! metacharacters are escaped for the store and direct matching, query-string
//! syntax is escaped for the search backend.

use crate::error::{CoreError, Result};
use crate::field::ValueType;
use crate::operator::{OperatorFamily, OperatorKind};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::{json, Value as Json};

/// Literals treated as "false" by boolean coercion and the absent-field rule
pub const FALSY_LITERALS: [&str; 4] = ["no", "false", "f", "0"];

const TRUTHY_LITERALS: [&str; 4] = ["yes", "true", "t", "1"];

/// A typed scalar parsed from a literal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl Scalar {
    /// Parse a raw literal into the given value type
    pub fn parse(raw: &str, value_type: ValueType) -> Option<Scalar> {
        match value_type {
            ValueType::Int => raw.trim().parse().ok().map(Scalar::Int),
            ValueType::Bool => Some(Scalar::Bool(Scalar::is_truthy(raw))),
            ValueType::String => Some(Scalar::Str(raw.to_string())),
        }
    }

    pub fn is_truthy(raw: &str) -> bool {
        TRUTHY_LITERALS.contains(&raw.trim().to_lowercase().as_str())
    }

    pub fn is_falsy(raw: &str) -> bool {
        FALSY_LITERALS.contains(&raw.trim().to_lowercase().as_str())
    }

    pub fn to_json(&self) -> Json {
        match self {
            Scalar::Int(i) => json!(i),
            Scalar::Bool(b) => json!(b),
            Scalar::Str(s) => json!(s),
        }
    }
}

/// Value handed to an operator when building a search-backend clause
#[derive(Debug, Clone, PartialEq)]
pub enum SearchValue {
    /// Typed value addressed at the real entity path
    Typed(Json),
    /// Free-text query string (pattern and full-text operators)
    QueryString(String),
}

#[derive(Debug, Clone)]
enum Parsed {
    List(Vec<Scalar>),
    Single(Scalar),
    Pattern { source: String, regex: Regex },
}

/// A condition literal coerced for one field type and operator
#[derive(Debug, Clone)]
pub struct FilterValue {
    literal: String,
    operator: OperatorKind,
    parsed: Parsed,
}

impl FilterValue {
    /// Coerce `literal` for `operator` on a field of `value_type`.
    ///
    /// `field` is only used for error reporting.
    pub fn parse(
        field: &str,
        literal: &str,
        operator: OperatorKind,
        value_type: ValueType,
    ) -> Result<Self> {
        let invalid = |reason: String| CoreError::InvalidValue {
            field: field.to_string(),
            value: literal.to_string(),
            reason,
        };

        let parsed = match operator.family() {
            OperatorFamily::Membership | OperatorFamily::FullText => {
                let items = literal
                    .split(',')
                    .map(|item| {
                        Scalar::parse(item.trim(), value_type)
                            .ok_or_else(|| invalid(format!("'{}' is not {}", item, value_type)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Parsed::List(items)
            }
            OperatorFamily::Comparison => Parsed::Single(
                Scalar::parse(literal, value_type)
                    .ok_or_else(|| invalid(format!("expected {}", value_type)))?,
            ),
            OperatorFamily::Pattern => {
                let text = regex::escape(literal);
                let source = match operator {
                    OperatorKind::StartsWith => format!("^{}", text),
                    OperatorKind::EndsWith => format!(".*{}", text),
                    _ => format!(".*{}.*", text),
                };
                // Anchored at the start only, like the store's prefix-anchored regex match
                let regex = RegexBuilder::new(&format!("^(?:{})", source))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CoreError::InvalidPattern {
                        pattern: source.clone(),
                        source: e,
                    })?;
                Parsed::Pattern { source, regex }
            }
        };

        Ok(Self {
            literal: literal.to_string(),
            operator,
            parsed,
        })
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn operator(&self) -> OperatorKind {
        self.operator
    }

    /// Typed list for membership/full-text operators
    pub fn list(&self) -> Option<&[Scalar]> {
        match &self.parsed {
            Parsed::List(items) => Some(items),
            _ => None,
        }
    }

    /// Lower-cased textual form of the list, used for case-insensitive membership
    pub fn folded_list(&self) -> Option<Vec<String>> {
        self.list()
            .map(|items| items.iter().map(|s| fold(&s.to_json())).collect())
    }

    pub fn single(&self) -> Option<&Scalar> {
        match &self.parsed {
            Parsed::Single(s) => Some(s),
            _ => None,
        }
    }

    pub fn regex(&self) -> Option<&Regex> {
        match &self.parsed {
            Parsed::Pattern { regex, .. } => Some(regex),
            _ => None,
        }
    }

    /// Regex source as sent to the document store (`.*v.*`, `^v`, `.*v`)
    pub fn pattern(&self) -> Option<&str> {
        match &self.parsed {
            Parsed::Pattern { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Value for the document store: a case-insensitive regex object or the typed value
    pub fn to_store_value(&self) -> Json {
        match &self.parsed {
            Parsed::List(items) => Json::Array(items.iter().map(Scalar::to_json).collect()),
            Parsed::Single(s) => s.to_json(),
            Parsed::Pattern { source, .. } => json!({ "$regex": source, "$options": "i" }),
        }
    }

    /// Value for the search backend addressed at `path`
    pub fn to_search_value(&self, path: &str) -> SearchValue {
        match &self.parsed {
            Parsed::Pattern { .. } => {
                let term = escape_query_string(&self.literal);
                let wildcard = match self.operator {
                    OperatorKind::StartsWith => format!("{}*", term),
                    OperatorKind::EndsWith => format!("*{}", term),
                    _ => format!("*{}*", term),
                };
                SearchValue::QueryString(format!("{}:{}", path, wildcard))
            }
            _ if self.operator == OperatorKind::Match => {
                SearchValue::QueryString(self.literal.clone())
            }
            _ => SearchValue::Typed(self.to_store_value()),
        }
    }

    /// Order-insensitive comparison key for duplicate detection.
    ///
    /// Comma-separated literals compare as upper-cased multisets of their
    /// elements; single literals compare upper-cased.
    pub fn comparison_key(literal: &str) -> Vec<String> {
        if literal.contains(',') {
            let mut items: Vec<String> = literal
                .split(',')
                .map(|item| item.trim().to_uppercase())
                .collect();
            items.sort();
            items
        } else {
            vec![literal.to_uppercase()]
        }
    }
}

/// Lower-cased textual form of a JSON scalar for case-insensitive comparisons
pub fn fold(value: &Json) -> String {
    text_of(value).to_lowercase()
}

/// Textual form of a JSON value (strings unquoted, integral floats as integers)
pub fn text_of(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn escape_query_string(raw: &str) -> String {
    const RESERVED: &str = r#"+-=&|><!(){}[]^"~*?:\/ "#;
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if RESERVED.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_values() {
        let v = FilterValue::parse("urgency", "1,2", OperatorKind::In, ValueType::Int).unwrap();
        assert_eq!(v.to_store_value(), json!([1, 2]));

        let v = FilterValue::parse("priority", "3", OperatorKind::NotIn, ValueType::Int).unwrap();
        assert_eq!(v.to_store_value(), json!([3]));

        let v = FilterValue::parse("headline", "test", OperatorKind::Like, ValueType::String)
            .unwrap();
        assert_eq!(v.pattern(), Some(".*test.*"));

        let v = FilterValue::parse("headline", "test", OperatorKind::NotLike, ValueType::String)
            .unwrap();
        assert_eq!(v.pattern(), Some(".*test.*"));

        let v = FilterValue::parse("headline", "test", OperatorKind::StartsWith, ValueType::String)
            .unwrap();
        assert_eq!(
            v.to_store_value(),
            json!({"$regex": "^test", "$options": "i"})
        );

        let v = FilterValue::parse("headline", "test", OperatorKind::EndsWith, ValueType::String)
            .unwrap();
        assert_eq!(v.pattern(), Some(".*test"));
    }

    #[test]
    fn test_bool_coercion() {
        let v = FilterValue::parse("sms", "true", OperatorKind::In, ValueType::Bool).unwrap();
        assert_eq!(v.to_store_value(), json!([true]));
        let v = FilterValue::parse("sms", "No", OperatorKind::In, ValueType::Bool).unwrap();
        assert_eq!(v.to_store_value(), json!([false]));
    }

    #[test]
    fn test_invalid_int_literal() {
        let err = FilterValue::parse("urgency", "1,x", OperatorKind::In, ValueType::Int)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { .. }));
    }

    #[test]
    fn test_pattern_literal_is_text() {
        let v = FilterValue::parse("headline", "U.S.", OperatorKind::Like, ValueType::String)
            .unwrap();
        assert_eq!(v.pattern(), Some(r".*U\.S\..*"));
        assert_eq!(
            v.to_search_value("headline"),
            SearchValue::QueryString("headline:*U.S.*".to_string())
        );

        let regex = v.regex().unwrap();
        assert!(regex.is_match("Talks with the u.s. team"));
        assert!(!regex.is_match("UKSA deal"));

        let v = FilterValue::parse("headline", "(", OperatorKind::Like, ValueType::String)
            .unwrap();
        assert!(v.regex().unwrap().is_match("a (quoted) aside"));
    }

    #[test]
    fn test_search_values() {
        let v = FilterValue::parse("headline", "tor", OperatorKind::Like, ValueType::String)
            .unwrap();
        assert_eq!(
            v.to_search_value("headline"),
            SearchValue::QueryString("headline:*tor*".to_string())
        );

        let v = FilterValue::parse("headline", "big deal", OperatorKind::StartsWith, ValueType::String)
            .unwrap();
        assert_eq!(
            v.to_search_value("headline"),
            SearchValue::QueryString(r"headline:big\ deal*".to_string())
        );

        let v = FilterValue::parse("urgency", "3,4", OperatorKind::In, ValueType::Int).unwrap();
        assert_eq!(v.to_search_value("urgency"), SearchValue::Typed(json!([3, 4])));
    }

    #[test]
    fn test_comparison_key_is_order_insensitive() {
        assert_eq!(
            FilterValue::comparison_key("4,2,3"),
            FilterValue::comparison_key("2,3,4")
        );
        assert_ne!(
            FilterValue::comparison_key("4,2,3"),
            FilterValue::comparison_key("2,3")
        );
        assert_eq!(
            FilterValue::comparison_key("Story"),
            FilterValue::comparison_key("STORY")
        );
    }

    #[test]
    fn test_text_of_numbers() {
        assert_eq!(text_of(&json!(3)), "3");
        assert_eq!(text_of(&json!(3.0)), "3");
        assert_eq!(text_of(&json!(true)), "true");
    }
}
