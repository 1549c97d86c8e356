//! HTTP surface: maps the REST API in spec.md §6 onto `Registry`
//! operations. Built on `axum`, matching the admin-API precedent set by
//! the `gatemini`/PrismGate manifest in the retrieval pack (DESIGN.md).

use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::{DispatchError, RegistryError};
use crate::registry::{JobDescriptor, Registry};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/api/jobs", get(list_jobs).post(start_job))
        .route("/api/jobs/{id}", get(get_job).delete(stop_job))
        .route("/api/jobs/{id}/log", get(get_job))
        .with_state(AppState { registry })
        .layer(TraceLayer::new_for_http())
}

#[derive(Deserialize)]
struct StartRequest {
    cmd: Vec<String>,
}

#[derive(Serialize)]
struct JobResponse {
    id: String,
    cmd: String,
    status: &'static str,
    output: String,
}

impl From<JobDescriptor> for JobResponse {
    fn from(d: JobDescriptor) -> Self {
        JobResponse {
            id: d.id,
            cmd: d.cmd,
            status: d.status,
            output: d.output,
        }
    }
}

#[derive(Serialize)]
struct ListResponse {
    #[serde(rename = "idList")]
    id_list: Vec<String>,
}

#[derive(Serialize)]
struct StopResponse {
    success: bool,
}

async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(ListResponse {
        id_list: state.registry.list(),
    })
}

async fn start_job(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<AxumResponse, DispatchError> {
    let req: StartRequest = serde_json::from_slice(&body)
        .map_err(|e| DispatchError::MalformedRequest(e.to_string()))?;
    if req.cmd.is_empty() {
        return Err(DispatchError::MalformedRequest("cmd must be non-empty".into()));
    }
    // Registry::start spawns the child and blocks briefly for the settle
    // delay; run it on a blocking-pool thread so it doesn't stall the
    // async executor (spec.md §5).
    let descriptor = tokio::task::spawn_blocking(move || state.registry.start(req.cmd))
        .await
        .expect("start_job blocking task panicked");
    Ok((StatusCode::CREATED, Json(JobResponse::from(descriptor))).into_response())
}

async fn get_job(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<AxumResponse, DispatchError> {
    let descriptor = state.registry.get(&id)?;
    Ok(Json(JobResponse::from(descriptor)).into_response())
}

async fn stop_job(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<AxumResponse, DispatchError> {
    let success = state.registry.stop(&id)?;
    Ok(Json(StopResponse { success }).into_response())
}

/// Maps dispatcher errors onto HTTP status codes (spec.md §4.3 / §7):
/// unknown identifier -> 404, malformed body -> 400, everything else -> 500.
impl IntoResponse for DispatchError {
    fn into_response(self) -> AxumResponse {
        match self {
            DispatchError::MalformedRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            DispatchError::Registry(RegistryError::UnknownIdentifier(id)) => {
                (StatusCode::NOT_FOUND, format!("{id} is not a valid id\n")).into_response()
            }
            DispatchError::Registry(RegistryError::Job(e)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(Registry::new()))
    }

    #[tokio::test]
    async fn list_starts_empty() {
        let resp = app()
            .oneshot(Request::builder().uri("/api/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_unknown_job_is_404() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/api/jobs/5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn start_then_get_round_trips() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/jobs")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"cmd":["echo","hi"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn start_with_malformed_body_is_400() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/jobs")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
