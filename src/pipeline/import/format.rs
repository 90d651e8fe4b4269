use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ImportError;

/// Member that marks a ZIP archive as a WordprocessingML document.
pub const DOCX_BODY_PART: &str = "word/document.xml";

/// Source document kinds the extraction adapter understands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Pdf,
    Docx,
    PlainText,
    Unsupported,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "plain_text",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::PlainText => "text/plain",
            Self::Unsupported => "application/octet-stream",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Result of format detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDetection {
    pub mime_type: String,
    pub format: SourceFormat,
    pub file_size_bytes: u64,
}

/// Detect the format of an upload from its magic bytes (NOT the file name).
pub fn detect_format(bytes: &[u8]) -> FormatDetection {
    let format = match bytes {
        // PDF: starts with %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => SourceFormat::Pdf,
        // ZIP local file header: PK\x03\x04
        [0x50, 0x4B, 0x03, 0x04, ..] => {
            if has_docx_body(bytes) {
                SourceFormat::Docx
            } else {
                SourceFormat::Unsupported
            }
        }
        _ if is_likely_text(bytes) => SourceFormat::PlainText,
        _ => SourceFormat::Unsupported,
    };

    FormatDetection {
        mime_type: format.mime_type().to_string(),
        format,
        file_size_bytes: bytes.len() as u64,
    }
}

/// Reject empty and oversized uploads before any parsing happens.
pub fn check_upload_size(len: usize, max_bytes: u64) -> Result<(), ImportError> {
    if len == 0 {
        return Err(ImportError::EmptyFile);
    }
    if len as u64 > max_bytes {
        return Err(ImportError::FileTooLarge {
            size_mb: len as f64 / (1024.0 * 1024.0),
            max_mb: max_bytes / (1024 * 1024),
        });
    }
    Ok(())
}

fn has_docx_body(bytes: &[u8]) -> bool {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map(|archive| archive.file_names().any(|name| name == DOCX_BODY_PART))
        .unwrap_or(false)
}

/// Check if bytes are likely plain text (valid UTF-8, mostly printable)
fn is_likely_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }

    let sample = &bytes[..bytes.len().min(4096)];
    // A multi-byte character may straddle the sample boundary.
    let text = match std::str::from_utf8(sample) {
        Ok(t) => t,
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&sample[..e.valid_up_to()]) {
            Ok(t) => t,
            Err(_) => return false,
        },
        Err(_) => return false,
    };

    // At least 80% printable characters (or whitespace)
    let total = text.chars().count();
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    let ratio = printable as f64 / total.max(1) as f64;
    ratio > 0.80
}

/// Sanitize a filename: strip path components, limit length
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}
