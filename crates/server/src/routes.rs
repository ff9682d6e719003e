// crates/server/src/routes.rs
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use rickover::callback::{CallbackReducer, CallbackStatus};
use rickover::id::JobId;
use rickover::model::{ArchivedJob, JobType, QueuedJob};
use rickover::store::Store;
use rickover::StoreError;

use crate::auth::Credentials;

/// 100 KiB, matching the Store's enqueue payload limit.
pub const MAX_PAYLOAD_BYTES: usize = 100 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub callback: CallbackReducer,
    pub credentials: Credentials,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/jobs", post(register_type))
        .route("/v1/jobs/:ident", get(lookup_bare))
        .route(
            "/v1/jobs/:name/:id",
            get(lookup_with_name).put(enqueue).post(callback),
        )
        .route("/v1/jobs/:id/replay", post(replay_bare))
        .route("/v1/jobs/:name/:id/replay", post(replay_named))
        .route("/healthz", get(health))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_basic_auth,
        ))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn store_err(e: StoreError) -> Response {
    match e {
        StoreError::NotFound => {
            (StatusCode::NOT_FOUND, Json(ErrorBody { error: "not found".into() })).into_response()
        }
        StoreError::UnknownOrArchived => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "unknown job type or id already archived".into(),
            }),
        )
            .into_response(),
        StoreError::Conflict(msg) => {
            (StatusCode::CONFLICT, Json(ErrorBody { error: msg })).into_response()
        }
        StoreError::InvalidArgument(msg) => {
            (StatusCode::BAD_REQUEST, Json(ErrorBody { error: msg })).into_response()
        }
        StoreError::LockUnavailable => (
            StatusCode::CONFLICT,
            Json(ErrorBody {
                error: "lock unavailable".into(),
            }),
        )
            .into_response(),
        StoreError::Transient(e) => {
            warn!(error = %e, "transient store error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody {
                    error: "transient store error".into(),
                }),
            )
                .into_response()
        }
        StoreError::Fatal(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: msg })).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterTypeRequest {
    name: String,
    delivery_strategy: String,
    attempts: i16,
    concurrency: i16,
}

async fn register_type(
    State(state): State<AppState>,
    Json(body): Json<RegisterTypeRequest>,
) -> Response {
    match state
        .store
        .job_types
        .register_type(&body.name, &body.delivery_strategy, body.attempts, body.concurrency)
        .await
    {
        Ok(jt) => (StatusCode::CREATED, Json(jt_view(&jt))).into_response(),
        Err(e) => store_err(e),
    }
}

#[derive(Debug, Serialize)]
struct JobTypeView {
    name: String,
    delivery_strategy: String,
    attempts: i16,
    concurrency: i16,
    created_at: DateTime<Utc>,
}

fn jt_view(jt: &JobType) -> JobTypeView {
    JobTypeView {
        name: jt.name.clone(),
        delivery_strategy: jt.delivery_strategy.clone(),
        attempts: jt.attempts,
        concurrency: jt.concurrency,
        created_at: jt.created_at,
    }
}

#[derive(Debug, Serialize)]
struct QueuedJobView {
    id: String,
    name: String,
    attempts: i16,
    run_after: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    status: String,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn queued_view(job: &QueuedJob) -> QueuedJobView {
    QueuedJobView {
        id: JobId::from(job.id).to_prefixed_string(),
        name: job.name.clone(),
        attempts: job.attempts,
        run_after: job.run_after,
        expires_at: job.expires_at,
        status: job.status.clone(),
        data: job.data.clone(),
        created_at: job.created_at,
        updated_at: job.updated_at,
    }
}

#[derive(Debug, Serialize)]
struct ArchivedJobView {
    id: String,
    name: String,
    attempts: i16,
    status: String,
    created_at: DateTime<Utc>,
    data: Value,
    expires_at: Option<DateTime<Utc>>,
}

fn archived_view(job: &ArchivedJob) -> ArchivedJobView {
    ArchivedJobView {
        id: JobId::from(job.id).to_prefixed_string(),
        name: job.name.clone(),
        attempts: job.attempts,
        status: job.status.clone(),
        created_at: job.created_at,
        data: job.data.clone(),
        expires_at: job.expires_at,
    }
}

/// `GET /v1/jobs/:ident` — `:ident` is either a registered type name
/// (fetch-type semantics) or a bare job id (lookup-queued-then-archived,
/// with no expected type). Types and ids never collide in practice since
/// ids always carry a 36-character UUID tail.
async fn lookup_bare(State(state): State<AppState>, Path(ident): Path<String>) -> Response {
    if let Ok(jt) = state.store.job_types.get(&ident).await {
        return (StatusCode::OK, Json(jt_view(&jt))).into_response();
    }

    let Ok(id) = JobId::parse(&ident) else {
        return store_err(StoreError::NotFound);
    };
    lookup_by_id(&state, id.uuid(), None).await
}

async fn lookup_with_name(
    State(state): State<AppState>,
    Path((name, ident)): Path<(String, String)>,
) -> Response {
    let Ok(id) = JobId::parse(&ident) else {
        return store_err(StoreError::InvalidArgument("malformed job id".into()));
    };
    lookup_by_id(&state, id.uuid(), Some(name)).await
}

async fn lookup_by_id(
    state: &AppState,
    id: uuid::Uuid,
    expected_name: Option<String>,
) -> Response {
    if let Ok(job) = state.store.queued_jobs.get(id).await {
        if let Some(name) = &expected_name {
            if *name != job.name {
                return store_err(StoreError::NotFound);
            }
        }
        return (StatusCode::OK, Json(queued_view(&job))).into_response();
    }

    match state.store.archived_jobs.get_archived(id).await {
        Ok(job) => {
            if let Some(name) = &expected_name {
                if *name != job.name {
                    return store_err(StoreError::NotFound);
                }
            }
            (StatusCode::OK, Json(archived_view(&job))).into_response()
        }
        Err(e) => store_err(e),
    }
}

#[derive(Debug, Deserialize)]
struct EnqueueRequest {
    data: Value,
    run_after: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

async fn enqueue(
    State(state): State<AppState>,
    Path((name, ident)): Path<(String, String)>,
    Json(body): Json<EnqueueRequest>,
) -> Response {
    let Ok(id) = JobId::parse(&ident) else {
        return store_err(StoreError::InvalidArgument("malformed job id".into()));
    };

    let data_json = body.data.to_string();
    if data_json.len() > MAX_PAYLOAD_BYTES {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorBody {
                error: "payload exceeds 100 KiB".into(),
            }),
        )
            .into_response();
    }

    let run_after = body.run_after.unwrap_or_else(Utc::now);
    match state
        .store
        .queued_jobs
        .enqueue(id.uuid(), &name, run_after, body.expires_at, &data_json)
        .await
    {
        Ok(job) => (StatusCode::ACCEPTED, Json(queued_view(&job))).into_response(),
        Err(e) => store_err(e),
    }
}

async fn replay_bare(State(state): State<AppState>, Path(ident): Path<String>) -> Response {
    replay(state, ident, None).await
}

async fn replay_named(
    State(state): State<AppState>,
    Path((name, ident)): Path<(String, String)>,
) -> Response {
    replay(state, ident, Some(name)).await
}

async fn replay(state: AppState, ident: String, override_name: Option<String>) -> Response {
    let Ok(id) = JobId::parse(&ident) else {
        return store_err(StoreError::InvalidArgument("malformed job id".into()));
    };

    match state
        .store
        .replay(id.uuid(), override_name.as_deref(), None)
        .await
    {
        Ok(job) => (StatusCode::ACCEPTED, Json(queued_view(&job))).into_response(),
        Err(e) => store_err(e),
    }
}

#[derive(Debug, Deserialize)]
struct CallbackRequest {
    status: CallbackStatus,
    attempt: i16,
    #[serde(default = "default_retryable")]
    retryable: bool,
}

fn default_retryable() -> bool {
    true
}

async fn callback(
    State(state): State<AppState>,
    Path((name, ident)): Path<(String, String)>,
    Json(body): Json<CallbackRequest>,
) -> Response {
    let Ok(id) = JobId::parse(&ident) else {
        return store_err(StoreError::InvalidArgument("malformed job id".into()));
    };

    match state
        .callback
        .handle(id.uuid(), &name, body.status, body.attempt, body.retryable)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_err(e),
    }
}
