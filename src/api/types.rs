//! Shared types for the HTTP layer.

use std::sync::Arc;

use serde::Serialize;

use crate::core_state::{CoreState, EditOutcome, FieldsView};

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// A file taken from a multipart `file` field.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Response to `PUT /api/fields`.
#[derive(Debug, Serialize)]
pub struct EditResponse {
    #[serde(flatten)]
    pub outcome: EditOutcome,
    pub fields: FieldsView,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}
