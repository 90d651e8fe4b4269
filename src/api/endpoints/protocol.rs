//! Protocol upload: text extraction plus field extraction.

use axum::extract::{Multipart, State};
use axum::Json;

use super::read_upload;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::core_state::IngestReport;
use crate::pipeline::import::sanitize_filename;

/// `POST /api/protocol`: multipart `file` holding a PDF, DOCX or text
/// protocol. Fields already set by the user are not overwritten.
pub async fn upload(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<IngestReport>, ApiError> {
    let upload = read_upload(multipart).await?;
    let file_name = sanitize_filename(&upload.file_name);
    let report = ctx.core.ingest_source(&file_name, upload.bytes).await?;
    Ok(Json(report))
}
