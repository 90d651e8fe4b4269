use super::docx::DocxTextExtractor;
use super::pdf::{join_pages, PdfTextExtractor};
use super::sanitize::sanitize_source_text;
use super::types::{PdfExtractor, SourceText, SourceTextExtractor};
use super::ExtractionError;
use crate::pipeline::import::SourceFormat;

/// Routes an upload to the right backend and cleans the result.
/// The PDF backend is injected so tests can run without real PDFs.
pub struct DocumentTextExtractor {
    pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
    docx_extractor: DocxTextExtractor,
}

impl DocumentTextExtractor {
    pub fn new(pdf_extractor: Box<dyn PdfExtractor + Send + Sync>) -> Self {
        Self {
            pdf_extractor,
            docx_extractor: DocxTextExtractor,
        }
    }
}

impl Default for DocumentTextExtractor {
    fn default() -> Self {
        Self::new(Box::new(PdfTextExtractor))
    }
}

impl SourceTextExtractor for DocumentTextExtractor {
    fn extract(&self, bytes: &[u8], format: SourceFormat) -> Result<SourceText, ExtractionError> {
        tracing::info!(
            format = format.as_str(),
            size_bytes = bytes.len(),
            "Starting text extraction"
        );

        let raw = match format {
            SourceFormat::Pdf => {
                let pages = self.pdf_extractor.extract_pages(bytes)?;
                tracing::debug!(pages = pages.len(), "PDF pages extracted");
                join_pages(&pages)
            }
            SourceFormat::Docx => self.docx_extractor.extract_text(bytes)?,
            SourceFormat::PlainText => String::from_utf8(bytes.to_vec())
                .map_err(|e| ExtractionError::EncodingError(e.to_string()))?,
            SourceFormat::Unsupported => {
                return Err(ExtractionError::UnsupportedFormat(
                    format.mime_type().to_string(),
                ))
            }
        };

        let text = SourceText::new(sanitize_source_text(&raw));
        if text.is_empty() {
            tracing::warn!(format = format.as_str(), "Source document has no text layer");
            return Err(ExtractionError::EmptyDocument);
        }

        tracing::info!(chars = text.as_str().chars().count(), "Text extraction complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::types::PageText;
    use crate::pipeline::extraction::docx::tests::protocol_docx;

    struct MockPdfExtractor {
        pages: Vec<&'static str>,
    }

    impl PdfExtractor for MockPdfExtractor {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
            Ok(self
                .pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageText {
                    page_number: i + 1,
                    text: text.to_string(),
                })
                .collect())
        }
    }

    struct FailingPdfExtractor;

    impl PdfExtractor for FailingPdfExtractor {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
            Err(ExtractionError::PdfParsing("xref table broken".into()))
        }
    }

    fn extractor(pages: Vec<&'static str>) -> DocumentTextExtractor {
        DocumentTextExtractor::new(Box::new(MockPdfExtractor { pages }))
    }

    #[test]
    fn pdf_pages_joined_in_order() {
        let text = extractor(vec!["Protocol No. ABC-123  ", "\n  Phase 2"])
            .extract(b"%PDF-1.4", SourceFormat::Pdf)
            .unwrap();
        assert_eq!(text.as_str(), "Protocol No. ABC-123\nPhase 2");
    }

    #[test]
    fn pdf_without_text_layer_is_empty() {
        let err = extractor(vec!["", "  \n "])
            .extract(b"%PDF-1.4", SourceFormat::Pdf)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyDocument));
    }

    #[test]
    fn pdf_backend_failure_propagates() {
        let err = DocumentTextExtractor::new(Box::new(FailingPdfExtractor))
            .extract(b"%PDF-1.4", SourceFormat::Pdf)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::PdfParsing(_)));
    }

    #[test]
    fn docx_source_is_converted() {
        let bytes = protocol_docx(&["제1상", "Sponsor: Acme"]);
        let text = extractor(vec![]).extract(&bytes, SourceFormat::Docx).unwrap();
        assert_eq!(text.as_str(), "제1상\nSponsor: Acme");
    }

    #[test]
    fn plain_text_passes_through_sanitizer() {
        let text = extractor(vec![])
            .extract("\u{FEFF}Version 1.0\r\n".as_bytes(), SourceFormat::PlainText)
            .unwrap();
        assert_eq!(text.as_str(), "Version 1.0");
    }

    #[test]
    fn invalid_utf8_text_is_an_encoding_error() {
        let err = extractor(vec![])
            .extract(&[0xFF, 0xFE, 0x41], SourceFormat::PlainText)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EncodingError(_)));
    }

    #[test]
    fn unsupported_format_rejected() {
        let err = extractor(vec![])
            .extract(&[0x00, 0x01], SourceFormat::Unsupported)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat(_)));
    }

    #[test]
    fn real_pdf_backend_reads_generated_pdf() {
        let bytes = crate::pipeline::extraction::pdf::tests::make_test_pdf(&["Protocol No. XY-9"]);
        let text = DocumentTextExtractor::default()
            .extract(&bytes, SourceFormat::Pdf)
            .unwrap();
        assert!(text.as_str().contains("XY"), "got: {text}");
    }
}
