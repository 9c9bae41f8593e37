use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::models::{ErrorBody, ListJobsQuery, ListJobsResponse};
use crate::error::HistoryError;
use crate::jobs::model::JobId;
use crate::jobs::views::JobDetailView;
use crate::jobs::HistoryService;

pub mod models;

#[derive(Clone)]
pub struct ApiState {
    pub history: HistoryService,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job))
        // Health
        .route("/health", get(health))
        .with_state(state)
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn history_err(e: HistoryError) -> ApiError {
    let status = match &e {
        HistoryError::NotFound(_) => StatusCode::NOT_FOUND,
        HistoryError::InvalidScope(_) => StatusCode::BAD_REQUEST,
        HistoryError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        HistoryError::AttemptNotRunning { .. } => StatusCode::CONFLICT,
        HistoryError::LogUnavailable { .. }
        | HistoryError::UnmappedStatus { .. }
        | HistoryError::InconsistentRecord(_)
        | HistoryError::Database(_)
        | HistoryError::Output(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %e, "history query failed");
    }

    (
        status,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
}

pub async fn list_jobs(
    State(state): State<ApiState>,
    Query(q): Query<ListJobsQuery>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let jobs = state
        .history
        .list_jobs(q.config_type.into(), &q.config_id)
        .await
        .map_err(history_err)?;

    Ok(Json(ListJobsResponse { jobs }))
}

pub async fn get_job(
    Path(id): Path<JobId>,
    State(state): State<ApiState>,
) -> Result<Json<JobDetailView>, ApiError> {
    let detail = state.history.get_job(id).await.map_err(history_err)?;
    Ok(Json(detail))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
