//! API error types with structured JSON responses.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::core_state::CoreError;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::import::ImportError;
use crate::pipeline::template::TemplateError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Source document unreadable: {0}")]
    SourceUnreadable(String),
    #[error("Template is missing values for: {}", .0.join(", "))]
    MissingTokens(Vec<String>),
    #[error("Template invalid: {message}")]
    TemplateInvalid {
        part: Option<String>,
        message: String,
        explanations: Vec<String>,
    },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None),
            ApiError::UnsupportedFormat(detail) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FORMAT",
                detail,
                None,
            ),
            ApiError::PayloadTooLarge(detail) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                detail,
                None,
            ),
            ApiError::SourceUnreadable(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "SOURCE_UNREADABLE",
                format!("The document text could not be read: {detail}"),
                None,
            ),
            ApiError::MissingTokens(missing) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MISSING_TOKENS",
                format!("Template needs values for: {}", missing.join(", ")),
                Some(json!({ "missing": missing })),
            ),
            ApiError::TemplateInvalid {
                part,
                message,
                explanations,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TEMPLATE_INVALID",
                message,
                Some(json!({ "part": part, "explanations": explanations })),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
            CoreError::TaskJoin(detail) => ApiError::Internal(detail),
            CoreError::Import(e) => e.into(),
            CoreError::Extraction(e) => e.into(),
            CoreError::Template(e) => e.into(),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::UnsupportedFormat(name) => {
                ApiError::UnsupportedFormat(format!("{name} is not a PDF, DOCX or text document"))
            }
            ImportError::FileTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            ImportError::EmptyFile => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedFormat(detail) => ApiError::UnsupportedFormat(detail),
            other => ApiError::SourceUnreadable(other.to_string()),
        }
    }
}

impl From<TemplateError> for ApiError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::MissingTokens(missing) => ApiError::MissingTokens(missing),
            TemplateError::MalformedPart {
                part,
                message,
                explanations,
            } => ApiError::TemplateInvalid {
                message: format!("{part}: {message}"),
                part: Some(part),
                explanations,
            },
            TemplateError::Archive(_) | TemplateError::NotDocx(_) => ApiError::TemplateInvalid {
                part: None,
                message: err.to_string(),
                explanations: Vec::new(),
            },
            TemplateError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}
