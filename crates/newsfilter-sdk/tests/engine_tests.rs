//! End-to-end tests for FilterEngine over seeded in-memory storage

mod common;

use chrono::{TimeZone, Utc};
use common::{article, engine, matching_ids, SEED};
use newsfilter_compiler::CompileError;
use newsfilter_core::CoreError;
use newsfilter_repository::{ConsumerKind, RepositoryError};
use newsfilter_sdk::{
    ConditionAtom, EngineConfig, FilterEngineBuilder, FilterExpression, FilterGroup, MatchMode,
    MemoryConsumers, Product, SdkError, Subscriber, Vocabulary, VocabularyEvent,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_seeded_filters_match() {
    let engine = engine();

    assert_eq!(matching_ids(&engine, "1").await, vec!["7"]);
    assert_eq!(matching_ids(&engine, "2").await, vec!["3", "4", "7"]);
    assert!(matching_ids(&engine, "3").await.is_empty());

    let torque = json!({"headline": "Torque", "urgency": 5});
    assert!(engine.does_filter_id_match("3", &torque).await.unwrap());
}

#[tokio::test]
async fn test_unknown_filter_id() {
    let engine = engine();

    assert!(matches!(
        engine.does_filter_id_match("nope", &article("1")).await,
        Err(SdkError::FilterNotFound(id)) if id == "nope"
    ));
    assert!(matches!(
        engine.store_query("nope").await,
        Err(SdkError::FilterNotFound(_))
    ));
}

#[tokio::test]
async fn test_store_queries() -> anyhow::Result<()> {
    let engine = engine();

    assert_eq!(
        engine.store_query("1").await?,
        json!({"genre.name": {"$in": ["Sidebar"]}})
    );
    assert_eq!(
        engine.store_query("3").await?,
        json!({"$and": [
            {"headline": {"$regex": ".*tor.*", "$options": "i"}},
            {"$or": [
                {"genre.name": {"$in": ["Sidebar"]}},
                {"urgency": {"$in": [3, 4, 5]}}
            ]}
        ]})
    );
    Ok(())
}

#[tokio::test]
async fn test_search_queries() -> anyhow::Result<()> {
    let engine = engine();
    let group = json!({"bool": {
        "must": [{"terms": {"genre.name": ["Sidebar"]}}],
        "must_not": [{"term": {"state": "spiked"}}]
    }});

    assert_eq!(
        engine.search_query("1", MatchMode::Matching).await?,
        json!({"bool": {"should": [group.clone()]}})
    );
    assert_eq!(
        engine.search_query("1", MatchMode::NotMatching).await?,
        json!({"bool": {"must_not": [group]}})
    );
    Ok(())
}

#[tokio::test]
async fn test_unstored_filter_matches_against_stored_atoms() {
    let engine = engine();

    for doc in common::articles() {
        assert!(engine.does_match(None, &doc).await.unwrap());
    }

    let adhoc = FilterExpression::new("", "adhoc").with_group(FilterGroup::new().atom("11"));
    assert!(engine.does_match(Some(&adhoc), &article("4")).await.unwrap());
    assert!(!engine.does_match(Some(&adhoc), &article("5")).await.unwrap());

    // nested filter missing from storage counts as a match
    let dangling = FilterExpression::new("x", "x").with_group(FilterGroup::new().atom("11").filter("gone"));
    assert!(engine.does_match(Some(&dangling), &article("4")).await.unwrap());
}

#[tokio::test]
async fn test_global_and_api_blocking_filters() {
    let engine = engine();

    // sms-flagged article is blocked by the global filter
    assert!(!engine.conforms_global_filters(&article("3"), &[]).await.unwrap());
    assert!(engine
        .conforms_global_filters(&article("3"), &["sms-block"])
        .await
        .unwrap());
    assert!(engine.conforms_global_filters(&article("4"), &[]).await.unwrap());

    assert!(engine.is_api_blocked(&article("7")).await.unwrap());
    assert!(!engine.is_api_blocked(&article("1")).await.unwrap());
}

#[tokio::test]
async fn test_condition_lifecycle() {
    let engine = engine();

    let created = engine
        .create_condition(ConditionAtom::new("", "priority", "in", "1,2"))
        .await
        .unwrap();
    assert!(!created.id.is_empty());

    let similar = engine
        .find_similar_conditions(&ConditionAtom::new("", "urgency", "in", "5"))
        .await
        .unwrap();
    assert_eq!(similar.len(), 3);

    assert!(matches!(
        engine
            .create_condition(ConditionAtom::new("", "urgency", "in", "3, 5,4"))
            .await,
        Err(SdkError::Repository(RepositoryError::DuplicateAtom { existing })) if existing == "urgency-345"
    ));

    // still used by filter `1` and `sidebar-api`
    match engine.delete_condition("6").await {
        Err(SdkError::Repository(RepositoryError::InUse { references, .. })) => {
            let mut names: Vec<String> = references.into_iter().map(|r| r.name).collect();
            names.sort();
            assert_eq!(names, vec!["sidebar-api", "soccer-only"]);
        }
        other => panic!("expected InUse, got {:?}", other.map(|_| ())),
    }

    engine.delete_condition(&created.id).await.unwrap();
}

#[tokio::test]
async fn test_unknown_operator_rejected_in_both_modes() {
    for strict in [false, true] {
        let engine = FilterEngineBuilder::new()
            .with_seed_yaml(SEED)
            .strict_operators(strict)
            .build()
            .unwrap();
        assert!(matches!(
            engine
                .create_condition(ConditionAtom::new("", "headline", "contains", "storm"))
                .await,
            Err(SdkError::Repository(RepositoryError::Core(CoreError::UnknownOperator(_))))
        ));
    }
}

#[tokio::test]
async fn test_strict_operators_apply_to_stored_atoms() {
    // written before validation, straight into storage
    let seed = SEED.replacen(
        "filter_conditions:\n",
        "filter_conditions:\n  - { _id: legacy, name: legacy, field: headline, operator: contains, value: tor }\n",
        1,
    );
    let legacy = FilterExpression::new("legacy-filter", "legacy-filter")
        .with_group(FilterGroup::new().atom("legacy"));

    let lenient = FilterEngineBuilder::new().with_seed_yaml(seed.clone()).build().unwrap();
    assert!(lenient
        .does_match(Some(&legacy), &json!({"headline": "Torque"}))
        .await
        .unwrap());

    let strict = FilterEngineBuilder::new()
        .with_seed_yaml(seed)
        .strict_operators(true)
        .build()
        .unwrap();
    assert!(strict
        .does_match(Some(&legacy), &json!({"headline": "Torque"}))
        .await
        .is_err());
}

#[tokio::test]
async fn test_vocabulary_refresh() {
    let engine = engine();
    let regions = ConditionAtom::new("r", "regions", "in", "EU");

    assert!(matches!(
        engine.create_condition(regions.clone()).await,
        Err(SdkError::Repository(RepositoryError::Core(CoreError::UnknownField(_))))
    ));

    engine
        .catalog()
        .apply(VocabularyEvent::Upserted(
            Vocabulary::new("regions").manageable().with_item("EU", "Europe"),
        ))
        .await;
    engine.create_condition(regions).await.unwrap();

    let filter = engine
        .create_filter(FilterExpression::new("", "europe").with_group(FilterGroup::new().atom("r")))
        .await
        .unwrap();
    let doc = json!({"subject": [
        {"qcode": "EU", "scheme": "regions"},
        {"qcode": "05001000"}
    ]});
    assert!(engine.does_filter_id_match(&filter.id, &doc).await.unwrap());
    assert!(!engine
        .does_filter_id_match(&filter.id, &json!({"subject": [{"qcode": "EU"}]}))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_embargo_against_fixed_clock() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let engine = FilterEngineBuilder::new()
        .with_seed_yaml(SEED)
        .with_clock(now)
        .build()
        .unwrap();

    engine
        .create_condition(ConditionAtom::new("e", "embargo", "eq", "true"))
        .await
        .unwrap();
    engine
        .create_filter(FilterExpression::new("embargoed", "embargoed").with_group(FilterGroup::new().atom("e")))
        .await
        .unwrap();

    assert_eq!(
        engine.store_query("embargoed").await.unwrap(),
        json!({"embargo": {"$gt": {"$date": "2024-05-01T12:00:00+00:00"}}})
    );
    let future = json!({"embargo": "2024-05-02T00:00:00+00:00"});
    let past = json!({"embargo": "2024-04-30T00:00:00+00:00"});
    assert!(engine.does_filter_id_match("embargoed", &future).await.unwrap());
    assert!(!engine.does_filter_id_match("embargoed", &past).await.unwrap());
}

#[tokio::test]
async fn test_filter_update_cycle_rejected() {
    let engine = engine();

    let cyclic = FilterExpression::new("1", "soccer-only").with_group(FilterGroup::new().filter("3"));
    assert!(matches!(
        engine.update_filter(cyclic).await,
        Err(SdkError::Repository(RepositoryError::Compile(
            CompileError::CircularReference { .. }
        )))
    ));

    // the stored version is untouched
    assert_eq!(matching_ids(&engine, "1").await, vec!["7"]);
}

#[tokio::test]
async fn test_filter_delete_guarded_by_subscribers() {
    let consumers = Arc::new(
        MemoryConsumers::new()
            .with_product(Product::new("p1", "1"))
            .with_subscriber(Subscriber::new("Wire").with_product("p1")),
    );
    let engine = FilterEngineBuilder::new()
        .with_seed_yaml(SEED)
        .with_consumers(consumers.clone())
        .build()
        .unwrap();

    match engine.delete_filter("1").await {
        Err(SdkError::Repository(RepositoryError::InUse { references, .. })) => {
            assert_eq!(references[0].consumer, ConsumerKind::Subscriber);
            assert_eq!(references[0].name, "Wire");
            assert!(references
                .iter()
                .any(|r| r.consumer == ConsumerKind::ContentFilter && r.name == "soccer-only2"));
        }
        other => panic!("expected InUse, got {:?}", other),
    }

    engine.delete_filter("3").await.unwrap();
    assert!(matches!(
        engine.store_query("3").await,
        Err(SdkError::FilterNotFound(_))
    ));
}

#[tokio::test]
async fn test_depth_limit_from_config() {
    let config = EngineConfig::from_yaml_str("compiler:\n  max_depth: 1\n").unwrap();
    let engine = FilterEngineBuilder::new()
        .with_config(config)
        .with_seed_yaml(SEED)
        .build()
        .unwrap();

    // `3` -> `2` -> `1` is two levels of nesting
    assert!(matches!(
        engine.does_filter_id_match("3", &article("1")).await,
        Err(SdkError::Repository(RepositoryError::Compile(
            CompileError::DepthExceeded { limit: 1, .. }
        )))
    ));
    assert!(engine.does_filter_id_match("2", &article("7")).await.unwrap());
}
