// crates/rickover/tests/store.rs
mod common;

use chrono::Utc;
use rickover::store::Store;
use serial_test::serial;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn register_type_rejects_bad_at_most_once_budget() {
    let pool = common::setup_db().await;
    let store = Store::new(pool);

    let err = store
        .job_types
        .register_type("sms", "at_most_once", 3, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, rickover::StoreError::InvalidArgument(_)));
}

#[tokio::test]
#[serial]
async fn register_type_rejects_duplicate_name() {
    let pool = common::setup_db().await;
    let store = Store::new(pool);

    store
        .job_types
        .register_type("echo", "at_least_once", 3, 1)
        .await
        .unwrap();

    let err = store
        .job_types
        .register_type("echo", "at_least_once", 3, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, rickover::StoreError::Conflict(_)));
}

#[tokio::test]
#[serial]
async fn enqueue_rejects_unknown_type() {
    let pool = common::setup_db().await;
    let store = Store::new(pool);

    let err = store
        .queued_jobs
        .enqueue(Uuid::new_v4(), "nope", Utc::now(), None, "{}")
        .await
        .unwrap_err();
    assert!(matches!(err, rickover::StoreError::UnknownOrArchived));
}

#[tokio::test]
#[serial]
async fn enqueue_rejects_malformed_json_payload() {
    let pool = common::setup_db().await;
    let store = Store::new(pool);
    store
        .job_types
        .register_type("echo", "at_least_once", 3, 1)
        .await
        .unwrap();

    let err = store
        .queued_jobs
        .enqueue(Uuid::new_v4(), "echo", Utc::now(), None, "not json")
        .await
        .unwrap_err();
    assert!(matches!(err, rickover::StoreError::InvalidArgument(_)));
}

#[tokio::test]
#[serial]
async fn enqueue_after_archive_is_rejected_p9() {
    let pool = common::setup_db().await;
    let store = Store::new(pool);
    store
        .job_types
        .register_type("echo", "at_least_once", 3, 1)
        .await
        .unwrap();

    let id = Uuid::new_v4();
    store
        .queued_jobs
        .enqueue(id, "echo", Utc::now(), None, "{}")
        .await
        .unwrap();
    store
        .archived_jobs
        .create_archived(id, "echo", "succeeded", 3)
        .await
        .unwrap();
    store.queued_jobs.delete(id).await.unwrap();

    let err = store
        .queued_jobs
        .enqueue(id, "echo", Utc::now(), None, "{}")
        .await
        .unwrap_err();
    assert!(matches!(err, rickover::StoreError::UnknownOrArchived));
}

#[tokio::test]
#[serial]
async fn replay_copies_payload_and_resets_run_after_p10() {
    let pool = common::setup_db().await;
    let store = Store::new(pool);
    store
        .job_types
        .register_type("echo", "at_least_once", 3, 1)
        .await
        .unwrap();

    let original_id = Uuid::new_v4();
    let far_future = Utc::now() + chrono::Duration::days(1);
    store
        .queued_jobs
        .enqueue(original_id, "echo", far_future, None, r#"{"x":1}"#)
        .await
        .unwrap();
    store
        .archived_jobs
        .create_archived(original_id, "echo", "succeeded", 3)
        .await
        .unwrap();
    store.queued_jobs.delete(original_id).await.unwrap();

    let before = Utc::now();
    let replayed = store.replay(original_id, None, None).await.unwrap();

    assert_ne!(replayed.id, original_id);
    assert_eq!(replayed.data, serde_json::json!({"x": 1}));
    assert!(replayed.run_after >= before);
    assert!(replayed.run_after < far_future);
}

#[tokio::test]
#[serial]
async fn replay_rejects_currently_queued_id() {
    let pool = common::setup_db().await;
    let store = Store::new(pool);
    store
        .job_types
        .register_type("echo", "at_least_once", 3, 1)
        .await
        .unwrap();

    let id = Uuid::new_v4();
    store
        .queued_jobs
        .enqueue(id, "echo", Utc::now(), None, "{}")
        .await
        .unwrap();

    let err = store.replay(id, None, None).await.unwrap_err();
    assert!(matches!(err, rickover::StoreError::InvalidArgument(_)));
}
