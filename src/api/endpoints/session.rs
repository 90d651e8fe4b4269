//! Activity log and session reset.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StatusResponse};
use crate::core_state::LogEntry;

/// `GET /api/log`: newest entry last.
pub async fn log(State(ctx): State<ApiContext>) -> Json<Vec<LogEntry>> {
    Json(ctx.core.log_entries())
}

/// `POST /api/reset`
pub async fn reset(State(ctx): State<ApiContext>) -> Result<Json<StatusResponse>, ApiError> {
    ctx.core.reset().await?;
    Ok(Json(StatusResponse { status: "reset" }))
}
