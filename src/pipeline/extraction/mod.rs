pub mod types;
pub mod sanitize;
pub mod pdf;
pub mod docx;
pub mod orchestrator;

pub use types::*;
pub use sanitize::*;
pub use pdf::*;
pub use docx::*;
pub use orchestrator::*;

use thiserror::Error;

/// Failures while turning an uploaded source document into plain text.
///
/// The session treats every variant as recoverable: it is logged and the
/// field map is left untouched.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("DOCX parsing failed: {0}")]
    DocxParsing(String),

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("Document contains no extractable text")]
    EmptyDocument,

    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction worker stopped: {0}")]
    Interrupted(String),
}
