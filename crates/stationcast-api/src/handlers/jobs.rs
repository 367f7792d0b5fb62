//! Job submission, status and results handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use stationcast_core::types::JobView;

use crate::dto::request::{JobQuery, StartQuery};
use crate::dto::response::{ResultsResponse, StartResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST|GET /start
pub async fn start(
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let requested = query.requested_id()?;
    let record = state.dispatcher.submit(requested).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            job_id: record.job_id,
            status: record.status,
        }),
    ))
}

/// GET /status?jobId=
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Json<JobView>, ApiError> {
    let job_id = query.job_id()?;
    Ok(Json(state.status.get(&job_id).await?))
}

/// GET /results?jobId=
///
/// Always answers with the artifacts that exist, even for unknown jobs.
pub async fn results(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let job_id = query.job_id()?;
    let images = state.results.list(&job_id).await?;
    Ok(Json(ResultsResponse { job_id, images }))
}
