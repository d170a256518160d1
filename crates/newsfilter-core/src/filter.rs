//! Stored filter expressions
//!
//! A filter is an OR of AND-groups. Each group references condition atoms
//! (`fc`) and nested filters (`pf`) by id; every reference in a group must
//! hold for the group to hold.

use serde::{Deserialize, Serialize};

/// A named, storable filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Applied to every outgoing item
    #[serde(default)]
    pub is_global: bool,

    /// Blocks matching items from the content API
    #[serde(default)]
    pub api_block: bool,

    /// ORed groups
    #[serde(rename = "content_filter", default)]
    pub groups: Vec<FilterGroup>,
}

/// One AND-group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub expression: GroupExpression,
}

/// References held by a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupExpression {
    /// Condition atom ids
    #[serde(rename = "fc", default, skip_serializing_if = "Vec::is_empty")]
    pub atoms: Vec<String>,

    /// Nested filter ids
    #[serde(rename = "pf", default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
}

impl FilterExpression {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_global: false,
            api_block: false,
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }

    pub fn api_blocking(mut self) -> Self {
        self.api_block = true;
        self
    }

    pub fn references_atom(&self, atom_id: &str) -> bool {
        self.groups
            .iter()
            .any(|g| g.expression.atoms.iter().any(|id| id == atom_id))
    }

    pub fn references_filter(&self, filter_id: &str) -> bool {
        self.groups
            .iter()
            .any(|g| g.expression.filters.iter().any(|id| id == filter_id))
    }

    /// Nested filter ids in reference order, without duplicates
    pub fn nested_filter_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.groups.iter().flat_map(|g| g.expression.filters.iter()) {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        ids
    }

    /// Atom ids in reference order, without duplicates
    pub fn atom_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.groups.iter().flat_map(|g| g.expression.atoms.iter()) {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        ids
    }
}

impl FilterGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(mut self, id: impl Into<String>) -> Self {
        self.expression.atoms.push(id.into());
        self
    }

    pub fn filter(mut self, id: impl Into<String>) -> Self {
        self.expression.filters.push(id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.expression.atoms.is_empty() && self.expression.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let filter: FilterExpression = serde_json::from_value(json!({
            "_id": "f1",
            "name": "sport",
            "content_filter": [
                {"expression": {"fc": ["1", "2"]}},
                {"expression": {"pf": ["f2"], "fc": ["3"]}}
            ]
        }))
        .unwrap();

        assert_eq!(filter.groups.len(), 2);
        assert!(!filter.is_global);
        assert!(filter.references_atom("3"));
        assert!(filter.references_filter("f2"));
        assert!(!filter.references_filter("f1"));
        assert_eq!(filter.atom_ids(), vec!["1", "2", "3"]);

        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["content_filter"][0], json!({"expression": {"fc": ["1", "2"]}}));
    }

    #[test]
    fn test_nested_ids_are_deduplicated() {
        let filter = FilterExpression::new("f1", "f1")
            .with_group(FilterGroup::new().filter("f2").atom("1"))
            .with_group(FilterGroup::new().filter("f2").filter("f3"));
        assert_eq!(filter.nested_filter_ids(), vec!["f2", "f3"]);
        assert!(!filter.groups[0].is_empty());
        assert!(FilterGroup::new().is_empty());
    }
}
