// crates/rickover/tests/callback.rs
mod common;

use chrono::Utc;
use rickover::callback::{CallbackReducer, CallbackStatus};
use rickover::store::{ArchivedJobsRepo, JobTypesRepo, QueuedJobsRepo};
use serial_test::serial;

fn reducer(pool: sqlx::PgPool) -> CallbackReducer {
    CallbackReducer::new(
        QueuedJobsRepo::new(pool.clone()),
        ArchivedJobsRepo::new(pool.clone()),
        JobTypesRepo::new(pool),
    )
}

#[tokio::test]
#[serial]
async fn succeeded_archives_and_deletes() {
    let pool = common::setup_db().await;
    common::register_type(&pool, "echo", "at_least_once", 3, 1).await;
    let id = common::insert_queued_job(&pool, "echo", 3).await;

    reducer(pool.clone())
        .handle(id, "echo", CallbackStatus::Succeeded, 3, true)
        .await
        .unwrap();

    let archived = ArchivedJobsRepo::new(pool.clone())
        .get_archived(id)
        .await
        .unwrap();
    assert_eq!(archived.status, "succeeded");
    assert_eq!(archived.attempts, 3);
    assert!(QueuedJobsRepo::new(pool).get(id).await.is_err());
}

#[tokio::test]
#[serial]
async fn failed_retryable_schedules_backoff_s2() {
    let pool = common::setup_db().await;
    common::register_type(&pool, "echo", "at_least_once", 3, 1).await;
    let id = common::insert_queued_job(&pool, "echo", 3).await;

    let before = Utc::now();
    reducer(pool.clone())
        .handle(id, "echo", CallbackStatus::Failed, 3, true)
        .await
        .unwrap();

    let job = QueuedJobsRepo::new(pool.clone()).get(id).await.unwrap();
    assert_eq!(job.attempts, 2);
    assert_eq!(job.status, "queued");
    assert!(job.run_after >= before + chrono::Duration::seconds(1));
    assert!(job.run_after <= before + chrono::Duration::seconds(4));

    reducer(pool.clone())
        .handle(id, "echo", CallbackStatus::Failed, 2, true)
        .await
        .unwrap();
    let job2 = QueuedJobsRepo::new(pool.clone()).get(id).await.unwrap();
    assert_eq!(job2.attempts, 1);
    assert!(job2.run_after - job.run_after >= chrono::Duration::seconds(1));

    reducer(pool.clone())
        .handle(id, "echo", CallbackStatus::Failed, 1, true)
        .await
        .unwrap();
    let archived = ArchivedJobsRepo::new(pool.clone())
        .get_archived(id)
        .await
        .unwrap();
    assert_eq!(archived.status, "failed");
    assert_eq!(archived.attempts, 0);
}

#[tokio::test]
#[serial]
async fn at_most_once_never_retries_s3() {
    let pool = common::setup_db().await;
    common::register_type(&pool, "sms", "at_most_once", 1, 5).await;
    let id = common::insert_queued_job(&pool, "sms", 1).await;

    reducer(pool.clone())
        .handle(id, "sms", CallbackStatus::Failed, 1, true)
        .await
        .unwrap();

    let archived = ArchivedJobsRepo::new(pool.clone())
        .get_archived(id)
        .await
        .unwrap();
    assert_eq!(archived.status, "failed");
    assert!(QueuedJobsRepo::new(pool).get(id).await.is_err());
}

#[tokio::test]
#[serial]
async fn unretryable_failure_skips_requeue_s4() {
    let pool = common::setup_db().await;
    common::register_type(&pool, "echo", "at_least_once", 3, 1).await;
    let id = common::insert_queued_job(&pool, "echo", 3).await;

    reducer(pool.clone())
        .handle(id, "echo", CallbackStatus::Failed, 3, false)
        .await
        .unwrap();

    let archived = ArchivedJobsRepo::new(pool.clone())
        .get_archived(id)
        .await
        .unwrap();
    assert_eq!(archived.status, "failed");
    assert_eq!(archived.attempts, 2);
}

#[tokio::test]
#[serial]
async fn duplicate_succeeded_callback_is_idempotent_p6() {
    let pool = common::setup_db().await;
    common::register_type(&pool, "echo", "at_least_once", 3, 1).await;
    let id = common::insert_queued_job(&pool, "echo", 3).await;

    let r = reducer(pool.clone());
    r.handle(id, "echo", CallbackStatus::Succeeded, 3, true)
        .await
        .unwrap();
    // A second, late callback for the same id must not error and must not
    // produce a second archived row.
    r.handle(id, "echo", CallbackStatus::Succeeded, 3, true)
        .await
        .unwrap();

    let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM archived_jobs WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows.0, 1);
}
