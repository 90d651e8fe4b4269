//! API endpoint handlers, one module per resource.

pub mod fields;
pub mod health;
pub mod protocol;
pub mod render;
pub mod session;
pub mod template;

use axum::extract::Multipart;

use crate::api::error::ApiError;
use crate::api::types::Upload;

/// Name of the multipart field carrying the uploaded document.
pub const FILE_FIELD: &str = "file";

/// Pull the `file` field out of a multipart body. Other fields are ignored.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document").to_string();
        let bytes = field.bytes().await?;
        upload = Some(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    upload.ok_or_else(|| ApiError::BadRequest(format!("missing multipart field '{FILE_FIELD}'")))
}
