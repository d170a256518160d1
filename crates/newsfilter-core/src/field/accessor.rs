//! Field accessors

use super::{FieldKind, FieldValue, ValueType};
use crate::operator::{OperatorFamily, OperatorKind};
use crate::value::{FilterValue, Scalar};
use chrono::{DateTime, Utc};
use serde_json::{json, Value as Json};

pub(crate) const EMBARGO_PATH: &str = "embargo";
pub(crate) const FEATURE_MEDIA_PATH: &str = "associations.featuremedia";
pub(crate) const SCHEME_CONTAINER: &str = "subject";
pub(crate) const SCHEME_VALUE_PATH: &str = "subject.qcode";

/// Wide enough that html2text never wraps a realistic paragraph
const HTML_TEXT_WIDTH: usize = 4096;

/// Resolved, stateless view of one filterable field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccessor {
    name: String,
    kind: FieldKind,
    path: String,
    value_type: ValueType,
}

impl FieldAccessor {
    pub fn new(
        name: impl Into<String>,
        kind: FieldKind,
        path: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
            value_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Backend-addressable path (dot notation)
    pub fn entity_path(&self) -> &str {
        &self.path
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_computed(&self) -> bool {
        self.kind.is_computed()
    }

    /// Whether the document carries this field at all.
    ///
    /// Computed fields are always present: their value is derived.
    pub fn is_present(&self, doc: &Json) -> bool {
        match &self.kind {
            FieldKind::Path | FieldKind::Html => lookup(doc, &self.path).is_some(),
            FieldKind::Embargo | FieldKind::FeatureMedia => true,
            FieldKind::Vocabulary { scheme } => !scheme_values(doc, scheme).is_empty(),
        }
    }

    /// Extract the field's value, `None` when absent
    pub fn extract(&self, doc: &Json, now: DateTime<Utc>) -> Option<FieldValue> {
        match &self.kind {
            FieldKind::Path => lookup(doc, &self.path),
            FieldKind::Html => lookup(doc, &self.path).map(reduce_html),
            FieldKind::Embargo => Some(FieldValue::Single(Json::Bool(is_embargoed(doc, now)))),
            FieldKind::FeatureMedia => Some(FieldValue::Single(Json::Bool(has_feature_media(doc)))),
            FieldKind::Vocabulary { scheme } => {
                let values = scheme_values(doc, scheme);
                if values.is_empty() {
                    None
                } else {
                    Some(FieldValue::Many(values))
                }
            }
        }
    }

    /// Document-store fragment for fields that bypass the generic
    /// `{path: {token: value}}` translation
    pub fn dedicated_store_fragment(
        &self,
        operator: OperatorKind,
        value: &FilterValue,
        now: DateTime<Utc>,
    ) -> Option<Json> {
        match &self.kind {
            FieldKind::Path | FieldKind::Html => None,
            FieldKind::Embargo => {
                let now = json!({ "$date": now.to_rfc3339() });
                if wants_true(operator, value) {
                    Some(json!({ EMBARGO_PATH: { "$gt": now } }))
                } else {
                    Some(json!({
                        "$or": [
                            { EMBARGO_PATH: null },
                            { EMBARGO_PATH: { "$lte": now } }
                        ]
                    }))
                }
            }
            FieldKind::FeatureMedia => {
                if wants_true(operator, value) {
                    Some(json!({ FEATURE_MEDIA_PATH: { "$ne": null } }))
                } else {
                    Some(json!({ FEATURE_MEDIA_PATH: null }))
                }
            }
            FieldKind::Vocabulary { scheme } => {
                let positive = operator.positive();
                let inner = if positive.family() == OperatorFamily::Pattern {
                    value.to_store_value()
                } else {
                    json!({ positive.store_token(): value.to_store_value() })
                };
                let elem_match = json!({ "$elemMatch": { "scheme": scheme, "qcode": inner } });
                if operator.is_negating() {
                    Some(json!({ SCHEME_CONTAINER: { "$not": elem_match } }))
                } else {
                    Some(json!({ SCHEME_CONTAINER: elem_match }))
                }
            }
        }
    }

    /// Search-backend fragment for fields that bypass the generic translation.
    ///
    /// Like the generic fragments this is the positive clause; negating
    /// operators are placed under `must_not` by the caller.
    pub fn dedicated_search_fragment(
        &self,
        operator: OperatorKind,
        value: &FilterValue,
    ) -> Option<Json> {
        match &self.kind {
            FieldKind::Path | FieldKind::Html => None,
            FieldKind::Embargo => {
                let range = json!({ "range": { EMBARGO_PATH: { "gt": "now" } } });
                Some(positive_or_inverted(literal_is_true(value), range))
            }
            FieldKind::FeatureMedia => {
                let exists = json!({ "exists": { "field": FEATURE_MEDIA_PATH } });
                Some(positive_or_inverted(literal_is_true(value), exists))
            }
            FieldKind::Vocabulary { scheme } => {
                let values = operator
                    .positive()
                    .to_search_fragment(SCHEME_VALUE_PATH, value.to_search_value(SCHEME_VALUE_PATH));
                Some(json!({
                    "bool": {
                        "must": [
                            { "term": { "subject.scheme": scheme } },
                            values
                        ]
                    }
                }))
            }
        }
    }
}

fn literal_is_true(value: &FilterValue) -> bool {
    match value.single() {
        Some(Scalar::Bool(b)) => *b,
        _ => Scalar::is_truthy(value.literal()),
    }
}

fn wants_true(operator: OperatorKind, value: &FilterValue) -> bool {
    let literal = literal_is_true(value);
    if operator == OperatorKind::Ne {
        !literal
    } else {
        literal
    }
}

fn positive_or_inverted(positive: bool, clause: Json) -> Json {
    if positive {
        clause
    } else {
        json!({ "bool": { "must_not": [clause] } })
    }
}

/// Walk a dot path, flattening arrays of sub-documents along the way.
///
/// Null leaves count as absent.
fn lookup(doc: &Json, path: &str) -> Option<FieldValue> {
    let mut current: Vec<&Json> = vec![doc];
    let mut many = false;

    for segment in path.split('.') {
        let mut next = Vec::new();
        for node in current {
            match node.get(segment) {
                None | Some(Json::Null) => {}
                Some(Json::Array(items)) => {
                    many = true;
                    next.extend(items.iter().filter(|v| !v.is_null()));
                }
                Some(other) => next.push(other),
            }
        }
        if next.is_empty() {
            return None;
        }
        current = next;
    }

    if many {
        Some(FieldValue::Many(current.into_iter().cloned().collect()))
    } else {
        current.into_iter().next().cloned().map(FieldValue::Single)
    }
}

fn reduce_html(value: FieldValue) -> FieldValue {
    let to_text = |v: Json| match v {
        Json::String(s) => Json::String(html_to_text(&s)),
        other => other,
    };
    match value {
        FieldValue::Single(v) => FieldValue::Single(to_text(v)),
        FieldValue::Many(values) => FieldValue::Many(values.into_iter().map(to_text).collect()),
    }
}

/// Plain text of an HTML fragment, whitespace collapsed; the raw value when
/// extraction fails
fn html_to_text(raw: &str) -> String {
    match html2text::from_read(raw.as_bytes(), HTML_TEXT_WIDTH) {
        Ok(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
        Err(e) => {
            tracing::debug!("HTML text extraction failed, using raw value: {}", e);
            raw.to_string()
        }
    }
}

fn is_embargoed(doc: &Json, now: DateTime<Utc>) -> bool {
    doc.get(EMBARGO_PATH)
        .and_then(Json::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|embargo| embargo.with_timezone(&Utc) > now)
        .unwrap_or(false)
}

fn has_feature_media(doc: &Json) -> bool {
    doc.pointer("/associations/featuremedia")
        .map(|v| !v.is_null())
        .unwrap_or(false)
}

fn scheme_values(doc: &Json, scheme: &str) -> Vec<Json> {
    doc.get(SCHEME_CONTAINER)
        .and_then(Json::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter(|entry| entry.get("scheme").and_then(Json::as_str) == Some(scheme))
                .filter_map(|entry| entry.get("qcode").cloned())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn accessor(kind: FieldKind, path: &str, ty: ValueType) -> FieldAccessor {
        FieldAccessor::new("test", kind, path, ty)
    }

    #[test]
    fn test_lookup_flattens_object_arrays() {
        let genre = accessor(FieldKind::Path, "genre.name", ValueType::String);
        let doc = json!({"genre": [{"name": "Sidebar"}, {"name": "Article"}]});
        assert_eq!(
            genre.extract(&doc, Utc::now()),
            Some(FieldValue::Many(vec![json!("Sidebar"), json!("Article")]))
        );
        assert!(!genre.is_present(&json!({"genre": null})));
        assert!(!genre.is_present(&json!({"headline": "x"})));
    }

    #[test]
    fn test_nested_scalar() {
        let desk = accessor(FieldKind::Path, "task.desk", ValueType::String);
        let doc = json!({"task": {"desk": "1"}});
        assert!(desk.is_present(&doc));
        assert_eq!(desk.extract(&doc, Utc::now()), Some(FieldValue::Single(json!("1"))));
        assert!(!desk.is_present(&json!({"task": {"stage": "2"}})));
    }

    #[test]
    fn test_html_is_reduced_to_text() {
        let body = accessor(FieldKind::Html, "body_html", ValueType::String);
        let doc = json!({"body_html": "<p>Mention</p><p>of the   day</p>"});
        assert_eq!(
            body.extract(&doc, Utc::now()),
            Some(FieldValue::Single(json!("Mention of the day")))
        );
    }

    #[test]
    fn test_embargo_is_computed() {
        let now = Utc::now();
        let embargo = accessor(FieldKind::Embargo, EMBARGO_PATH, ValueType::Bool);
        let future = (now + Duration::hours(2)).to_rfc3339();
        let past = (now - Duration::hours(2)).to_rfc3339();

        assert!(embargo.is_present(&json!({})));
        assert_eq!(
            embargo.extract(&json!({"embargo": future}), now),
            Some(FieldValue::Single(json!(true)))
        );
        assert_eq!(
            embargo.extract(&json!({"embargo": past}), now),
            Some(FieldValue::Single(json!(false)))
        );
        assert_eq!(
            embargo.extract(&json!({}), now),
            Some(FieldValue::Single(json!(false)))
        );
    }

    #[test]
    fn test_feature_media_fragments() {
        let media = accessor(FieldKind::FeatureMedia, FEATURE_MEDIA_PATH, ValueType::Bool);
        let value = FilterValue::parse("featuremedia", "true", OperatorKind::Eq, ValueType::Bool)
            .unwrap();
        assert_eq!(
            media.dedicated_search_fragment(OperatorKind::Eq, &value),
            Some(json!({"exists": {"field": "associations.featuremedia"}}))
        );
        assert_eq!(
            media.dedicated_store_fragment(OperatorKind::Ne, &value, Utc::now()),
            Some(json!({"associations.featuremedia": null}))
        );
    }

    #[test]
    fn test_vocabulary_scope() {
        let field = accessor(
            FieldKind::Vocabulary {
                scheme: "regions".to_string(),
            },
            SCHEME_VALUE_PATH,
            ValueType::String,
        );
        let doc = json!({"subject": [
            {"qcode": "05001000", "scheme": null},
            {"qcode": "EU", "scheme": "regions"}
        ]});
        assert_eq!(
            field.extract(&doc, Utc::now()),
            Some(FieldValue::Many(vec![json!("EU")]))
        );

        let value = FilterValue::parse("regions", "EU", OperatorKind::NotIn, ValueType::String)
            .unwrap();
        assert_eq!(
            field.dedicated_store_fragment(OperatorKind::NotIn, &value, Utc::now()),
            Some(json!({"subject": {"$not": {"$elemMatch": {
                "scheme": "regions",
                "qcode": {"$in": ["EU"]}
            }}}}))
        );
    }
}
