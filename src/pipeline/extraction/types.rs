use std::fmt;

use serde::Serialize;

use super::ExtractionError;
use crate::pipeline::import::SourceFormat;

/// Flattened text of one source document.
///
/// Produced once per upload, consumed by the field extractor, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceText(String);

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl AsRef<str> for SourceText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text of a single PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// PDF text extraction abstraction
pub trait PdfExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError>;
}

/// Converts an uploaded document into [`SourceText`].
pub trait SourceTextExtractor {
    fn extract(&self, bytes: &[u8], format: SourceFormat) -> Result<SourceText, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_text_is_empty() {
        assert!(SourceText::new(" \n\t ").is_empty());
        assert!(!SourceText::from("Phase 2").is_empty());
    }

    #[test]
    fn displays_inner_text() {
        let text = SourceText::new("제1상");
        assert_eq!(text.to_string(), "제1상");
        assert_eq!(text.as_ref(), "제1상");
    }
}
