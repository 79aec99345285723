use std::sync::{Arc, Mutex};

use mockall::predicate::eq;
use mongodb::bson::doc;
use rstest::*;

use crate::config::{save_config, IndexConfigEntry, IndexSpec};
use crate::core::client::database::{DatabaseError, MockIndexStore};
use crate::reconcile::ComparePolicy;
use crate::service::{apply_plan, build_plan, fetch_observed, load_desired, pull_config, ApplyProgress};
use crate::tests::common::{derived, index_set, keys, named, observed_index};
use crate::types::index::ObservedIndex;
use crate::types::plan::{CollectionDiff, ReconciliationPlan};

fn failure(collection: &str) -> DatabaseError {
    DatabaseError::UnnamedIndex { collection: collection.to_string() }
}

/// A store with `users` (`_id_`, `email_1`) and `empty` (`_id_` only).
fn seeded_store() -> MockIndexStore {
    let mut store = MockIndexStore::new();
    store.expect_list_collections().returning(|| Ok(vec!["empty".to_string(), "users".to_string()]));
    store.expect_list_indexes().with(eq("empty")).returning(|_| Ok(vec![observed_index("_id_", doc! { "_id": 1 })]));
    store.expect_list_indexes().with(eq("users")).returning(|_| {
        Ok(vec![
            observed_index("_id_", doc! { "_id": 1 }),
            ObservedIndex {
                name: "email_1".to_string(),
                keys: doc! { "email": 1 },
                unique: Some(true),
                expire_after_seconds: None,
            },
        ])
    });
    store
}

#[rstest]
#[tokio::test]
async fn fetch_observed_reads_only_included_collections() {
    let mut store = MockIndexStore::new();
    store.expect_list_collections().times(1).returning(|| Ok(vec!["audit".to_string(), "users".to_string()]));
    store
        .expect_list_indexes()
        .with(eq("users"))
        .times(1)
        .returning(|_| Ok(vec![observed_index("email_1", doc! { "email": 1 })]));

    let observed = fetch_observed(&store, |collection| collection == "users").await.unwrap();

    assert_eq!(observed, index_set(vec![("users", vec![named("email_1", &[("email", 1)])])]));
}

#[rstest]
#[tokio::test]
async fn build_plan_covers_configured_collections_only() {
    let store = seeded_store();
    let desired = index_set(vec![
        ("users", vec![derived(&[("email", 1)]).unique(true), derived(&[("name", 1)])]),
        ("orders", vec![derived(&[("placedAt", -1)])]),
    ]);

    let plan = build_plan(&store, &desired, ComparePolicy::KeysAndOptions).await.unwrap();

    assert_eq!(plan.len(), 2);
    assert_eq!(plan.get("users").unwrap().to_create, vec![derived(&[("name", 1)])]);
    assert!(plan.get("users").unwrap().to_drop.is_empty());
    assert_eq!(plan.get("orders").unwrap().to_create, vec![derived(&[("placedAt", -1)])]);
    assert!(plan.get("empty").is_none());
}

#[rstest]
#[tokio::test]
async fn build_plan_fails_when_indexes_cannot_be_listed() {
    let mut store = MockIndexStore::new();
    store.expect_list_collections().returning(|| Ok(vec!["users".to_string()]));
    store.expect_list_indexes().returning(|collection| Err(failure(collection)));

    let desired = index_set(vec![("users", vec![derived(&[("email", 1)])])]);

    assert!(build_plan(&store, &desired, ComparePolicy::KeysOnly).await.is_err());
}

#[rstest]
#[tokio::test]
async fn apply_runs_drops_before_creates_and_continues_after_failures() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut store = MockIndexStore::new();

    let log = calls.clone();
    store.expect_drop_index().times(2).returning(move |collection, name| {
        log.lock().unwrap().push(format!("drop {}.{}", collection, name));
        if name == "old_1" {
            return Err(failure(collection));
        }
        Ok(())
    });
    let log = calls.clone();
    store.expect_create_index().times(3).returning(move |collection, index| {
        log.lock().unwrap().push(format!("create {}.{}", collection, index.name));
        Ok(())
    });

    let mut plan = ReconciliationPlan::new();
    plan.push(CollectionDiff {
        collection: "users".to_string(),
        to_create: vec![derived(&[("a", 1)]), derived(&[("b", 1)])],
        to_drop: vec![named("old_1", &[("old", 1)])],
    });
    plan.push(CollectionDiff {
        collection: "orders".to_string(),
        to_create: vec![derived(&[("c", 1)])],
        to_drop: vec![named("stale_1", &[("stale", 1)])],
    });

    let report = apply_plan(&store, &plan, |_| {}).await;

    assert_eq!(
        *calls.lock().unwrap(),
        [
            "drop users.old_1",
            "create users.a_1",
            "create users.b_1",
            "drop orders.stale_1",
            "create orders.c_1",
        ]
    );
    assert_eq!(report.total(), 5);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.succeeded_count(), 4);
    assert!(!report.is_success());
    let failed = report.failures().next().unwrap();
    assert_eq!(failed.collection, "users");
    assert!(failed.operation.is_drop());
    assert_eq!(failed.operation.index().name, "old_1");
}

#[rstest]
#[tokio::test]
async fn progress_is_reported_around_each_operation() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut store = MockIndexStore::new();

    let log = events.clone();
    store.expect_drop_index().times(1).returning(move |collection, name| {
        log.lock().unwrap().push(format!("store drop {}", name));
        Err(failure(collection))
    });
    let log = events.clone();
    store.expect_create_index().times(1).returning(move |_, index| {
        log.lock().unwrap().push(format!("store create {}", index.name));
        Ok(())
    });

    let mut plan = ReconciliationPlan::new();
    plan.push(CollectionDiff {
        collection: "users".to_string(),
        to_create: vec![derived(&[("a", 1)])],
        to_drop: vec![named("old_1", &[("old", 1)])],
    });

    let log = events.clone();
    let report = apply_plan(&store, &plan, move |progress| {
        let line = match progress {
            ApplyProgress::Started { collection, operation } => {
                format!("started {}.{}", collection, operation.index().name)
            }
            ApplyProgress::Finished(outcome) => {
                format!("finished {} ok={}", outcome.operation.index().name, outcome.is_success())
            }
        };
        log.lock().unwrap().push(line);
    })
    .await;

    assert_eq!(
        *events.lock().unwrap(),
        [
            "started users.old_1",
            "store drop old_1",
            "finished old_1 ok=false",
            "started users.a_1",
            "store create a_1",
            "finished a_1 ok=true",
        ]
    );
    assert_eq!(report.total(), 2);
}

#[rstest]
#[tokio::test]
async fn empty_plan_touches_nothing() {
    let store = MockIndexStore::new();

    let report = apply_plan(&store, &ReconciliationPlan::new(), |_| {}).await;

    assert!(report.is_empty());
    assert!(report.is_success());
}

#[rstest]
#[tokio::test]
async fn pull_renders_every_collection_with_secondary_indexes() {
    let store = seeded_store();

    let entries = pull_config(&store).await.unwrap();

    assert_eq!(
        entries,
        vec![IndexConfigEntry {
            collection: "users".to_string(),
            indexes: vec![IndexSpec { is_unique: true, ..IndexSpec::new(keys(&[("email", 1)])) }],
        }]
    );
}

#[rstest]
fn load_desired_normalizes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("indexes.json");
    save_config(
        &path,
        &[IndexConfigEntry {
            collection: "users".to_string(),
            indexes: vec![IndexSpec::new(keys(&[("name", 1), ("age", -1)]))],
        }],
    )
    .unwrap();

    let desired = load_desired(&path).unwrap();

    assert_eq!(desired, index_set(vec![("users", vec![named("name_1_age_-1", &[("name", 1), ("age", -1)])])]));
}
