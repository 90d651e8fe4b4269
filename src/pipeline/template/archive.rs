use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};

use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::TemplateError;
use crate::config::MAX_PART_BYTES;
use crate::pipeline::import::DOCX_BODY_PART;

/// Where a templated part sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartRole {
    Body,
    Header,
    Footer,
    Other,
}

impl PartRole {
    pub fn classify(name: &str) -> Self {
        if name == DOCX_BODY_PART {
            Self::Body
        } else if is_numbered_part(name, "word/header") {
            Self::Header
        } else if is_numbered_part(name, "word/footer") {
            Self::Footer
        } else {
            Self::Other
        }
    }

    /// Only body, header and footer parts carry tokens.
    pub fn is_templated(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// `word/header.xml`, `word/header1.xml`, `word/header12.xml`, ...
fn is_numbered_part(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|digits| digits.chars().all(|c| c.is_ascii_digit()))
}

/// A decompressed body, header or footer part.
#[derive(Debug, Clone)]
pub struct TemplatePart {
    pub name: String,
    pub role: PartRole,
    data: Vec<u8>,
}

impl TemplatePart {
    /// Part markup as UTF-8, or a `MalformedPart` error naming the part.
    pub fn markup(&self) -> Result<&str, TemplateError> {
        std::str::from_utf8(&self.data).map_err(|e| TemplateError::MalformedPart {
            part: self.name.clone(),
            message: "part is not valid UTF-8".to_string(),
            explanations: vec![format!(
                "invalid byte sequence at offset {}",
                e.valid_up_to()
            )],
        })
    }

    /// Markup with invalid sequences replaced; used by scanning, which
    /// must not fail.
    pub fn markup_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// A DOCX template held in memory.
///
/// The original archive bytes are kept so that untouched members can be
/// copied through without recompression.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    source: Vec<u8>,
    parts: Vec<TemplatePart>,
    member_count: usize,
}

impl TemplateDocument {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TemplateError> {
        Self::from_bytes_with_limit(bytes, MAX_PART_BYTES)
    }

    /// Load with a ceiling on each templated part's decompressed size.
    pub fn from_bytes_with_limit(bytes: Vec<u8>, limit: u64) -> Result<Self, TemplateError> {
        let (parts, member_count) = {
            let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))?;
            let mut parts = Vec::new();
            let mut has_body = false;

            for i in 0..archive.len() {
                let mut file = archive.by_index(i)?;
                let role = PartRole::classify(file.name());
                if !role.is_templated() || file.is_dir() {
                    continue;
                }
                has_body |= role == PartRole::Body;

                let name = file.name().to_string();
                let mut data = Vec::new();
                file.by_ref()
                    .take(limit.saturating_add(1))
                    .read_to_end(&mut data)
                    .map_err(|e| decompress_error(&name, e))?;
                if data.len() as u64 > limit {
                    return Err(oversized_part(&name, limit));
                }
                parts.push(TemplatePart { name, role, data });
            }

            if !has_body {
                return Err(TemplateError::NotDocx(format!(
                    "archive has no {DOCX_BODY_PART} member"
                )));
            }
            (parts, archive.len())
        };

        Ok(Self {
            source: bytes,
            parts,
            member_count,
        })
    }

    /// Templated parts in archive order.
    pub fn parts(&self) -> impl Iterator<Item = &TemplatePart> {
        self.parts.iter()
    }

    pub fn part(&self, name: &str) -> Option<&TemplatePart> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn member_count(&self) -> usize {
        self.member_count
    }

    pub fn size_bytes(&self) -> usize {
        self.source.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.source
    }

    /// SHA-256 of the archive bytes, base64-encoded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.source);
        base64::engine::general_purpose::STANDARD.encode(digest)
    }

    /// Write a new archive where the named members carry the given markup.
    ///
    /// Every other member is copied raw, so member order and compression
    /// match the source archive.
    pub fn rewrite(&self, replacements: &HashMap<String, String>) -> Result<Vec<u8>, TemplateError> {
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.source.len())));

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            match replacements.get(file.name()) {
                Some(markup) => {
                    let name = file.name().to_string();
                    let method = match file.compression() {
                        CompressionMethod::Stored => CompressionMethod::Stored,
                        _ => CompressionMethod::Deflated,
                    };
                    drop(file);
                    let options = SimpleFileOptions::default().compression_method(method);
                    writer.start_file(name, options)?;
                    writer.write_all(markup.as_bytes())?;
                }
                None => writer.raw_copy_file(file)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Stream every member of the archive, failing on the first one that
/// decompresses to more than `limit` bytes. Nothing is buffered.
pub fn check_member_sizes(bytes: &[u8], limit: u64) -> Result<(), TemplateError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let read = io::copy(&mut file.by_ref().take(limit.saturating_add(1)), &mut io::sink())
            .map_err(|e| decompress_error(&name, e))?;
        if read > limit {
            return Err(oversized_part(&name, limit));
        }
    }
    Ok(())
}

fn decompress_error(part: &str, e: io::Error) -> TemplateError {
    TemplateError::MalformedPart {
        part: part.to_string(),
        message: "part could not be decompressed".to_string(),
        explanations: vec![e.to_string()],
    }
}

fn oversized_part(part: &str, limit: u64) -> TemplateError {
    TemplateError::MalformedPart {
        part: part.to_string(),
        message: format!("part expands beyond {limit} bytes"),
        explanations: vec![format!("decompressed size limit is {limit} bytes")],
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a DOCX-shaped archive from `(member name, content)` pairs.
    pub(crate) fn build_docx(members: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in members {
            let method = if name.ends_with(".png") {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            writer
                .start_file(*name, SimpleFileOptions::default().compression_method(method))
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Wrap paragraphs of plain run text in a minimal document part.
    pub(crate) fn document_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        )
    }

    fn member_names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect::<Vec<_>>()
    }

    fn read_member(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn classifies_parts() {
        assert_eq!(PartRole::classify("word/document.xml"), PartRole::Body);
        assert_eq!(PartRole::classify("word/header1.xml"), PartRole::Header);
        assert_eq!(PartRole::classify("word/header.xml"), PartRole::Header);
        assert_eq!(PartRole::classify("word/footer12.xml"), PartRole::Footer);
        assert_eq!(PartRole::classify("word/styles.xml"), PartRole::Other);
        assert_eq!(PartRole::classify("word/_rels/header1.xml.rels"), PartRole::Other);
        assert_eq!(PartRole::classify("word/headerA.xml"), PartRole::Other);
    }

    #[test]
    fn loads_templated_parts_only() {
        let bytes = build_docx(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", document_xml(&["{{PROTOCOL_NO}}"]).as_str()),
            ("word/styles.xml", "<w:styles/>"),
            ("word/footer1.xml", "<w:ftr/>"),
        ]);
        let doc = TemplateDocument::from_bytes(bytes).unwrap();

        let names: Vec<_> = doc.parts().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["word/document.xml", "word/footer1.xml"]);
        assert_eq!(doc.member_count(), 4);
        assert!(doc.part("word/styles.xml").is_none());
    }

    #[test]
    fn rejects_zip_without_body() {
        let bytes = build_docx(&[("word/styles.xml", "<w:styles/>")]);
        assert!(matches!(
            TemplateDocument::from_bytes(bytes),
            Err(TemplateError::NotDocx(_))
        ));
    }

    #[test]
    fn rejects_non_zip() {
        assert!(matches!(
            TemplateDocument::from_bytes(b"not a zip".to_vec()),
            Err(TemplateError::Archive(_))
        ));
    }

    #[test]
    fn non_utf8_part_is_malformed() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&[0x3C, 0xFF, 0xFE, 0x3E]).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let doc = TemplateDocument::from_bytes(bytes).unwrap();
        let part = doc.part("word/document.xml").unwrap();
        match part.markup() {
            Err(TemplateError::MalformedPart { part, .. }) => assert_eq!(part, "word/document.xml"),
            other => panic!("expected MalformedPart, got {other:?}"),
        }
        assert!(part.markup_lossy().contains('\u{FFFD}'));
    }

    #[test]
    fn fingerprint_is_stable() {
        let bytes = build_docx(&[("word/document.xml", "<w:document/>")]);
        let a = TemplateDocument::from_bytes(bytes.clone()).unwrap();
        let b = TemplateDocument::from_bytes(bytes).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 44);
    }

    #[test]
    fn rewrite_preserves_order_and_untouched_members() {
        let bytes = build_docx(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", "<w:t>{{A}}</w:t>"),
            ("word/media/image1.png", "PNGDATA"),
            ("word/header1.xml", "<w:t>{{B}}</w:t>"),
        ]);
        let doc = TemplateDocument::from_bytes(bytes.clone()).unwrap();

        let mut replacements = HashMap::new();
        replacements.insert("word/document.xml".to_string(), "<w:t>one</w:t>".to_string());
        let out = doc.rewrite(&replacements).unwrap();

        assert_eq!(member_names(&out), member_names(&bytes));
        assert_eq!(read_member(&out, "word/document.xml"), "<w:t>one</w:t>");
        assert_eq!(read_member(&out, "word/header1.xml"), "<w:t>{{B}}</w:t>");
        assert_eq!(read_member(&out, "word/media/image1.png"), "PNGDATA");

        let mut archive = ZipArchive::new(Cursor::new(out.as_slice())).unwrap();
        let image = archive.by_name("word/media/image1.png").unwrap();
        assert_eq!(image.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn oversized_part_is_rejected_without_buffering_it() {
        let filler = "A".repeat(4096);
        let body = document_xml(&[filler.as_str()]);
        let bytes = build_docx(&[("word/document.xml", body.as_str())]);

        match TemplateDocument::from_bytes_with_limit(bytes.clone(), 1024) {
            Err(TemplateError::MalformedPart { part, message, .. }) => {
                assert_eq!(part, "word/document.xml");
                assert!(message.contains("1024"));
            }
            other => panic!("expected MalformedPart, got {other:?}"),
        }
        assert!(TemplateDocument::from_bytes_with_limit(bytes, body.len() as u64).is_ok());
    }

    #[test]
    fn member_size_check_covers_untemplated_members() {
        let styles = "s".repeat(2048);
        let bytes = build_docx(&[
            ("word/document.xml", "<w:document/>"),
            ("word/styles.xml", styles.as_str()),
        ]);
        assert!(check_member_sizes(&bytes, 4096).is_ok());
        match check_member_sizes(&bytes, 1024) {
            Err(TemplateError::MalformedPart { part, .. }) => assert_eq!(part, "word/styles.xml"),
            other => panic!("expected MalformedPart, got {other:?}"),
        }
    }
}
