//! Template upload, inspection and removal.

use axum::extract::{Multipart, State};
use axum::Json;

use super::read_upload;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::core_state::TemplateSummary;
use crate::pipeline::import::sanitize_filename;

/// `POST /api/template`: multipart `file` holding a DOCX template.
pub async fn upload(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<TemplateSummary>, ApiError> {
    let upload = read_upload(multipart).await?;
    let file_name = sanitize_filename(&upload.file_name);
    Ok(Json(ctx.core.load_template(&file_name, upload.bytes).await?))
}

/// `GET /api/template`: tokens of the active template and which of them
/// the current fields cannot fill.
pub async fn summary(State(ctx): State<ApiContext>) -> Result<Json<TemplateSummary>, ApiError> {
    Ok(Json(ctx.core.template_summary()?))
}

/// `DELETE /api/template`: back to the built-in layout.
pub async fn clear(State(ctx): State<ApiContext>) -> Result<Json<TemplateSummary>, ApiError> {
    Ok(Json(ctx.core.clear_template().await?))
}
