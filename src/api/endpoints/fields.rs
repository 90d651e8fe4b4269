use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, EditResponse};
use crate::core_state::FieldsView;

/// `GET /api/fields`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<FieldsView>, ApiError> {
    Ok(Json(ctx.core.fields()?))
}

/// `PUT /api/fields`: flat object of name to value. Field names, tokens
/// and labels all resolve to their field; other names become custom
/// template values.
pub async fn update(
    State(ctx): State<ApiContext>,
    Json(edits): Json<BTreeMap<String, String>>,
) -> Result<Json<EditResponse>, ApiError> {
    let outcome = ctx.core.apply_edits(edits).await?;
    Ok(Json(EditResponse {
        outcome,
        fields: ctx.core.fields()?,
    }))
}
