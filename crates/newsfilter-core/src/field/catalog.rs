//! Field-capability catalog
//!
//! The catalog is partly static (the built-in newsroom fields) and partly
//! derived from the live controlled-vocabulary records. It is an explicit
//! value: callers build it at startup and rebuild it by applying
//! [`VocabularyEvent`]s.

use super::accessor::{SCHEME_VALUE_PATH, EMBARGO_PATH, FEATURE_MEDIA_PATH};
use super::{FieldAccessor, FieldKind, ValueType};
use crate::error::{CoreError, Result};
use crate::operator::OperatorKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One entry of a controlled vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub qcode: String,
    pub name: String,
}

impl VocabularyItem {
    pub fn new(qcode: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qcode: qcode.into(),
            name: name.into(),
        }
    }
}

/// A controlled vocabulary record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Built-in field this vocabulary provides values for, if any
    #[serde(default)]
    pub schema_field: Option<String>,

    /// Editable by users, which makes it filterable as its own field
    #[serde(default)]
    pub manageable: bool,

    #[serde(default)]
    pub items: Vec<VocabularyItem>,
}

impl Vocabulary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            schema_field: None,
            manageable: false,
            items: Vec::new(),
        }
    }

    pub fn manageable(mut self) -> Self {
        self.manageable = true;
        self
    }

    pub fn with_schema_field(mut self, field: impl Into<String>) -> Self {
        self.schema_field = Some(field.into());
        self
    }

    pub fn with_item(mut self, qcode: impl Into<String>, name: impl Into<String>) -> Self {
        self.items.push(VocabularyItem::new(qcode, name));
        self
    }
}

/// Change notification for the vocabulary catalog
#[derive(Debug, Clone, PartialEq)]
pub enum VocabularyEvent {
    Upserted(Vocabulary),
    Deleted(String),
}

/// Published capabilities of one filterable field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCapability {
    #[serde(rename = "field")]
    pub name: String,

    #[serde(skip)]
    pub kind: FieldKind,

    #[serde(skip)]
    pub path: String,

    #[serde(skip)]
    pub value_type: ValueType,

    pub operators: Vec<OperatorKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<VocabularyItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
}

impl FieldCapability {
    pub fn accessor(&self) -> FieldAccessor {
        FieldAccessor::new(
            self.name.clone(),
            self.kind.clone(),
            self.path.clone(),
            self.value_type,
        )
    }

    pub fn allows(&self, operator: OperatorKind) -> bool {
        self.operators.contains(&operator)
    }
}

#[derive(Debug, Clone, Copy)]
enum BuiltinKind {
    Path,
    Html,
    Embargo,
    FeatureMedia,
}

impl BuiltinKind {
    fn field_kind(self) -> FieldKind {
        match self {
            BuiltinKind::Path => FieldKind::Path,
            BuiltinKind::Html => FieldKind::Html,
            BuiltinKind::Embargo => FieldKind::Embargo,
            BuiltinKind::FeatureMedia => FieldKind::FeatureMedia,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ValuesFrom {
    Nothing,
    /// Items of the vocabulary with this id
    Vocabulary(&'static str),
    /// Items of the vocabulary with this id or this schema field
    SchemaField(&'static str),
    Static(&'static [(&'static str, &'static str)], &'static str),
}

struct Builtin {
    name: &'static str,
    kind: BuiltinKind,
    path: &'static str,
    value_type: ValueType,
    operators: &'static [OperatorKind],
    values: ValuesFrom,
}

use OperatorKind as Op;

const MEMBERSHIP: &[OperatorKind] = &[Op::In, Op::NotIn];
const TEXT: &[OperatorKind] = &[
    Op::In,
    Op::NotIn,
    Op::Like,
    Op::NotLike,
    Op::StartsWith,
    Op::EndsWith,
    Op::Match,
];
const NUMERIC: &[OperatorKind] = &[
    Op::In,
    Op::NotIn,
    Op::Eq,
    Op::Ne,
    Op::Gt,
    Op::Gte,
    Op::Lt,
    Op::Lte,
];
const PLACE: &[OperatorKind] = &[Op::In, Op::NotIn, Op::Match];
const FLAG: &[OperatorKind] = &[Op::Eq, Op::Ne];

const SMS_VALUES: &[(&str, &str)] = &[("0", "False"), ("1", "True")];

macro_rules! builtin {
    ($name:expr, $kind:ident, $path:expr, $ty:ident, $ops:expr, $values:expr) => {
        Builtin {
            name: $name,
            kind: BuiltinKind::$kind,
            path: $path,
            value_type: ValueType::$ty,
            operators: $ops,
            values: $values,
        }
    };
}

const BUILTINS: &[Builtin] = &[
    builtin!("anpa_category", Path, "anpa_category.qcode", String, MEMBERSHIP, ValuesFrom::Vocabulary("categories")),
    builtin!("urgency", Path, "urgency", Int, NUMERIC, ValuesFrom::Vocabulary("urgency")),
    builtin!("priority", Path, "priority", Int, NUMERIC, ValuesFrom::Vocabulary("priority")),
    builtin!("genre", Path, "genre.name", String, MEMBERSHIP, ValuesFrom::SchemaField("genre")),
    builtin!("subject", Path, "subject.qcode", String, MEMBERSHIP, ValuesFrom::SchemaField("subject")),
    builtin!("type", Path, "type", String, MEMBERSHIP, ValuesFrom::Vocabulary("type")),
    builtin!("keywords", Path, "keywords", String, MEMBERSHIP, ValuesFrom::Nothing),
    builtin!("ingest_provider", Path, "ingest_provider", String, MEMBERSHIP, ValuesFrom::Nothing),
    builtin!("agendas", Path, "agendas", String, MEMBERSHIP, ValuesFrom::Nothing),
    builtin!("slugline", Path, "slugline", String, TEXT, ValuesFrom::Nothing),
    builtin!("source", Path, "source", String, TEXT, ValuesFrom::Nothing),
    builtin!("headline", Path, "headline", String, TEXT, ValuesFrom::Nothing),
    builtin!("ednote", Path, "ednote", String, TEXT, ValuesFrom::Nothing),
    builtin!("anpa_take_key", Path, "anpa_take_key", String, TEXT, ValuesFrom::Nothing),
    builtin!("body_html", Html, "body_html", String, TEXT, ValuesFrom::Nothing),
    builtin!("desk", Path, "task.desk", String, MEMBERSHIP, ValuesFrom::Nothing),
    builtin!("stage", Path, "task.stage", String, MEMBERSHIP, ValuesFrom::Nothing),
    builtin!("sms", Path, "flags.marked_for_sms", Bool, MEMBERSHIP, ValuesFrom::Static(SMS_VALUES, "name")),
    builtin!("place", Path, "place.qcode", String, PLACE, ValuesFrom::Nothing),
    builtin!("embargo", Embargo, EMBARGO_PATH, Bool, FLAG, ValuesFrom::Nothing),
    builtin!("featuremedia", FeatureMedia, FEATURE_MEDIA_PATH, Bool, FLAG, ValuesFrom::Nothing),
];

/// Registry of filterable fields
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: BTreeMap<String, FieldCapability>,
    vocabularies: BTreeMap<String, Vocabulary>,
    /// Vocabulary ids that are filterable even when not manageable
    excluded: BTreeSet<String>,
}

impl FieldCatalog {
    /// Catalog of the built-in fields, with vocabulary-derived fields enabled
    /// for the given ids regardless of `manageable`
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self {
            fields: BTreeMap::new(),
            vocabularies: BTreeMap::new(),
            excluded: excluded.into_iter().map(Into::into).collect(),
        };
        catalog.rebuild();
        catalog
    }

    /// Built-in fields only
    pub fn builtin() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn with_vocabularies(mut self, vocabularies: impl IntoIterator<Item = Vocabulary>) -> Self {
        for vocabulary in vocabularies {
            self.vocabularies.insert(vocabulary.id.clone(), vocabulary);
        }
        self.rebuild();
        self
    }

    /// Apply a vocabulary change and rebuild the derived fields
    pub fn apply(&mut self, event: VocabularyEvent) {
        match event {
            VocabularyEvent::Upserted(vocabulary) => {
                tracing::debug!("Vocabulary '{}' upserted", vocabulary.id);
                self.vocabularies.insert(vocabulary.id.clone(), vocabulary);
            }
            VocabularyEvent::Deleted(id) => {
                tracing::debug!("Vocabulary '{}' deleted", id);
                self.vocabularies.remove(&id);
            }
        }
        self.rebuild();
    }

    /// Resolve a symbolic field name
    pub fn resolve(&self, name: &str) -> Result<FieldAccessor> {
        self.capability(name)
            .map(FieldCapability::accessor)
            .ok_or_else(|| CoreError::UnknownField(name.to_string()))
    }

    pub fn capability(&self, name: &str) -> Option<&FieldCapability> {
        self.fields.get(name)
    }

    pub fn capabilities(&self) -> Vec<&FieldCapability> {
        self.fields.values().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Check that `token` names an operator published for `field`.
    ///
    /// Storage validation never applies the lenient pattern fallback.
    pub fn check_operator(&self, field: &str, token: &str) -> Result<OperatorKind> {
        let capability = self
            .capability(field)
            .ok_or_else(|| CoreError::UnknownField(field.to_string()))?;
        let operator = token.parse::<OperatorKind>()?;

        if capability.allows(operator) {
            Ok(operator)
        } else {
            Err(CoreError::OperatorNotAllowed {
                field: field.to_string(),
                operator: token.to_string(),
            })
        }
    }

    fn rebuild(&mut self) {
        let mut fields = BTreeMap::new();

        for builtin in BUILTINS {
            let (values, value_field) = self.builtin_values(builtin.values);
            fields.insert(
                builtin.name.to_string(),
                FieldCapability {
                    name: builtin.name.to_string(),
                    kind: builtin.kind.field_kind(),
                    path: builtin.path.to_string(),
                    value_type: builtin.value_type,
                    operators: builtin.operators.to_vec(),
                    values,
                    value_field,
                },
            );
        }

        for vocabulary in self.vocabularies.values() {
            if fields.contains_key(&vocabulary.id) || self.feeds_builtin(vocabulary) {
                continue;
            }
            if !vocabulary.manageable && !self.excluded.contains(&vocabulary.id) {
                continue;
            }
            fields.insert(
                vocabulary.id.clone(),
                FieldCapability {
                    name: vocabulary.id.clone(),
                    kind: FieldKind::Vocabulary {
                        scheme: vocabulary.id.clone(),
                    },
                    path: SCHEME_VALUE_PATH.to_string(),
                    value_type: ValueType::String,
                    operators: MEMBERSHIP.to_vec(),
                    values: Some(vocabulary.items.clone()),
                    value_field: Some("qcode".to_string()),
                },
            );
        }

        self.fields = fields;
    }

    fn builtin_values(&self, source: ValuesFrom) -> (Option<Vec<VocabularyItem>>, Option<String>) {
        let from_vocabulary = |vocabulary: Option<&Vocabulary>| {
            (
                vocabulary.map(|v| v.items.clone()),
                vocabulary.map(|_| "qcode".to_string()),
            )
        };
        match source {
            ValuesFrom::Nothing => (None, None),
            ValuesFrom::Vocabulary(id) => from_vocabulary(self.vocabularies.get(id)),
            ValuesFrom::SchemaField(field) => from_vocabulary(
                self.vocabularies
                    .values()
                    .find(|v| v.schema_field.as_deref() == Some(field))
                    .or_else(|| self.vocabularies.get(field)),
            ),
            ValuesFrom::Static(items, value_field) => (
                Some(
                    items
                        .iter()
                        .map(|(qcode, name)| VocabularyItem::new(*qcode, *name))
                        .collect(),
                ),
                Some(value_field.to_string()),
            ),
        }
    }

    /// Vocabularies that supply values to a built-in field are not fields themselves
    fn feeds_builtin(&self, vocabulary: &Vocabulary) -> bool {
        BUILTINS.iter().any(|builtin| match builtin.values {
            ValuesFrom::Vocabulary(id) => vocabulary.id == id,
            ValuesFrom::SchemaField(field) => {
                vocabulary.id == field || vocabulary.schema_field.as_deref() == Some(field)
            }
            _ => false,
        })
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> FieldCatalog {
        FieldCatalog::builtin().with_vocabularies(vec![
            Vocabulary::new("categories").with_item("a", "Australian General News"),
            Vocabulary::new("urgency").with_item("1", "1").with_item("2", "2"),
            Vocabulary::new("regions").manageable().with_item("EU", "Europe"),
            Vocabulary::new("internal"),
        ])
    }

    #[test]
    fn test_builtin_resolution() {
        let catalog = catalog();
        let genre = catalog.resolve("genre").unwrap();
        assert_eq!(genre.entity_path(), "genre.name");
        assert_eq!(catalog.resolve("desk").unwrap().entity_path(), "task.desk");
        assert_eq!(
            catalog.resolve("urgency").unwrap().value_type(),
            ValueType::Int
        );
        assert!(catalog.resolve("embargo").unwrap().is_computed());
    }

    #[test]
    fn test_unknown_field() {
        let err = catalog().resolve("wordcount").unwrap_err();
        assert!(matches!(err, CoreError::UnknownField(name) if name == "wordcount"));
    }

    #[test]
    fn test_vocabulary_fields() {
        let catalog = catalog();
        let regions = catalog.resolve("regions").unwrap();
        assert_eq!(
            regions.kind(),
            &FieldKind::Vocabulary {
                scheme: "regions".to_string()
            }
        );
        // not manageable, not excluded
        assert!(!catalog.contains("internal"));
        // feeds anpa_category
        assert!(!catalog.contains("categories"));

        let catalog = FieldCatalog::new(["internal"]).with_vocabularies(vec![Vocabulary::new("internal")]);
        assert!(catalog.contains("internal"));
    }

    #[test]
    fn test_vocabulary_events() {
        let mut catalog = catalog();
        catalog.apply(VocabularyEvent::Upserted(
            Vocabulary::new("topics").manageable(),
        ));
        assert!(catalog.contains("topics"));

        catalog.apply(VocabularyEvent::Deleted("regions".to_string()));
        assert!(!catalog.contains("regions"));
        assert!(catalog.contains("headline"));
    }

    #[test]
    fn test_check_operator() {
        let catalog = catalog();
        assert_eq!(
            catalog.check_operator("headline", "startswith").unwrap(),
            OperatorKind::StartsWith
        );
        assert!(matches!(
            catalog.check_operator("genre", "like"),
            Err(CoreError::OperatorNotAllowed { .. })
        ));
        assert!(matches!(
            catalog.check_operator("headline", "contains"),
            Err(CoreError::UnknownOperator(_))
        ));
        assert!(matches!(
            catalog.check_operator("nope", "in"),
            Err(CoreError::UnknownField(_))
        ));
    }

    #[test]
    fn test_capability_listing() {
        let catalog = catalog();
        let listing = serde_json::to_value(catalog.capability("sms").unwrap()).unwrap();
        assert_eq!(
            listing,
            serde_json::json!({
                "field": "sms",
                "operators": ["in", "nin"],
                "values": [
                    {"qcode": "0", "name": "False"},
                    {"qcode": "1", "name": "True"}
                ],
                "value_field": "name"
            })
        );

        let urgency = catalog.capability("urgency").unwrap();
        assert_eq!(urgency.values.as_ref().map(Vec::len), Some(2));
        assert_eq!(catalog.capability("keywords").unwrap().values, None);
    }
}
