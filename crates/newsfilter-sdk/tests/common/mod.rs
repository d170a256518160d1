//! Common test utilities for SDK integration tests

#![allow(dead_code)]

use newsfilter_sdk::{FilterEngine, FilterEngineBuilder};
use serde_json::{json, Value};

/// Filter conditions and content filters shared by the engine tests.
///
/// `1` = genre Sidebar, `2` = filter `1` OR urgency 3,4,5,
/// `3` = headline like tor AND filter `2`. `sms-block` is global,
/// `sidebar-api` blocks the content API.
pub const SEED: &str = r#"
filter_conditions:
  - { _id: "1", name: headline-tor, field: headline, operator: like, value: tor }
  - { _id: "2", name: urgency-2, field: urgency, operator: in, value: "2" }
  - { _id: "3", name: urgency-345, field: urgency, operator: in, value: "3,4,5" }
  - { _id: "4", name: urgency-not-123, field: urgency, operator: nin, value: "1,2,3" }
  - { _id: "5", name: urgency-25, field: urgency, operator: in, value: "2,5" }
  - { _id: "6", name: sidebar, field: genre, operator: in, value: Sidebar }
  - { _id: "7", name: subject, field: subject, operator: in, value: "05005003" }
  - { _id: "8", name: category-a, field: anpa_category, operator: in, value: a }
  - { _id: "9", name: mention, field: body_html, operator: like, value: mention }
  - { _id: "10", name: sms, field: sms, operator: in, value: "true" }
  - { _id: "11", name: desk-1, field: desk, operator: in, value: "1" }
  - { _id: "12", name: headline-not-que, field: headline, operator: notlike, value: que }
  - { _id: "13", name: place-nsw, field: place, operator: match, value: NSW }
content_filters:
  - _id: "1"
    name: soccer-only
    content_filter:
      - expression: { fc: ["6"] }
  - _id: "2"
    name: soccer-only2
    content_filter:
      - expression: { pf: ["1"] }
      - expression: { fc: ["3"] }
  - _id: "3"
    name: soccer-only3
    content_filter:
      - expression: { fc: ["1"], pf: ["2"] }
  - _id: sms-block
    name: sms-block
    is_global: true
    content_filter:
      - expression: { fc: ["10"] }
  - _id: sidebar-api
    name: sidebar-api
    api_block: true
    content_filter:
      - expression: { fc: ["6"] }
"#;

/// Newsroom articles the seed filters are evaluated against
pub fn articles() -> Vec<Value> {
    vec![
        json!({"_id": "1", "urgency": 1, "headline": "story", "state": "fetched"}),
        json!({"_id": "2", "headline": "prtorque", "state": "fetched"}),
        json!({"_id": "3", "urgency": 3, "state": "fetched", "flags": {"marked_for_sms": true}}),
        json!({"_id": "4", "urgency": 4, "state": "fetched", "task": {"desk": "1"}}),
        json!({"_id": "5", "urgency": 2, "state": "fetched", "task": {"desk": "2"}}),
        json!({"_id": "6", "state": "fetched"}),
        json!({"_id": "7", "state": "fetched", "genre": [{"name": "Sidebar"}]}),
        json!({"_id": "8", "subject": [
            {"name": "a", "qcode": "05001000", "parent": "05000000"},
            {"name": "b", "qcode": "05005003", "parent": "05005000"}
        ]}),
        json!({"_id": "9", "state": "fetched", "anpa_category": [{"qcode": "a", "name": "Aus News"}]}),
        json!({"_id": "10", "body_html": "<p>Mention<p>"}),
        json!({"_id": "11", "place": [{"qcode": "NSW", "name": "NSW"}], "state": "fetched"}),
    ]
}

pub fn article(id: &str) -> Value {
    articles()
        .into_iter()
        .find(|a| a["_id"] == id)
        .unwrap_or_else(|| panic!("no fixture article {}", id))
}

/// Engine over in-memory storage seeded with [`SEED`]
pub fn engine() -> FilterEngine {
    FilterEngineBuilder::new()
        .with_seed_yaml(SEED)
        .build()
        .expect("seeded engine")
}

/// Ids of the fixture articles `filter_id` matches
pub async fn matching_ids(engine: &FilterEngine, filter_id: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for doc in articles() {
        if engine.does_filter_id_match(filter_id, &doc).await.unwrap() {
            ids.push(doc["_id"].as_str().unwrap().to_string());
        }
    }
    ids
}
