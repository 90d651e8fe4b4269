use std::collections::{BTreeMap, HashMap};

use super::archive::TemplateDocument;
use super::scanner::{explain_fault, scan_markup, TokenSet};
use super::xml::escape_text;
use super::TemplateError;
use crate::config::{OUTPUT_EXTENSION, OUTPUT_PLACEHOLDER, OUTPUT_PREFIX};

/// Tokens with no entry in `values`, in scan order.
///
/// An empty string is a value; only absent names are missing.
pub fn missing_tokens(tokens: &TokenSet, values: &BTreeMap<String, String>) -> Vec<String> {
    tokens
        .iter()
        .filter(|name| !values.contains_key(*name))
        .map(str::to_string)
        .collect()
}

/// Substitute every token of the template and return the new archive.
///
/// Validation runs before any part is touched: a missing value or a
/// syntax fault fails the whole render, never a partial one.
pub fn render(
    doc: &TemplateDocument,
    tokens: &TokenSet,
    values: &BTreeMap<String, String>,
) -> Result<Vec<u8>, TemplateError> {
    let missing = missing_tokens(tokens, values);
    if !missing.is_empty() {
        return Err(TemplateError::MissingTokens(missing));
    }

    let mut replacements = HashMap::new();
    for part in doc.parts() {
        let markup = part.markup()?;
        let scan = scan_markup(markup);

        if !scan.faults.is_empty() {
            return Err(TemplateError::MalformedPart {
                part: part.name.clone(),
                message: format!("{} template syntax fault(s)", scan.faults.len()),
                explanations: scan
                    .faults
                    .iter()
                    .map(|fault| explain_fault(markup, fault))
                    .collect(),
            });
        }
        if scan.occurrences.is_empty() {
            continue;
        }

        let mut out = String::with_capacity(markup.len());
        let mut last = 0;
        for occurrence in &scan.occurrences {
            let value = values
                .get(&occurrence.name)
                .ok_or_else(|| TemplateError::MissingTokens(vec![occurrence.name.clone()]))?;
            out.push_str(&markup[last..occurrence.start]);
            out.push_str(&value_markup(value));
            last = occurrence.end;
        }
        out.push_str(&markup[last..]);

        tracing::debug!(
            part = %part.name,
            tokens = scan.occurrences.len(),
            "Substituted template part"
        );
        replacements.insert(part.name.clone(), out);
    }

    doc.rewrite(&replacements)
}

/// XML-escaped value with braces written as character references, so a
/// value can never reintroduce a delimiter into the rendered markup.
fn value_markup(value: &str) -> String {
    let escaped = escape_text(value);
    if !escaped.contains(['{', '}']) {
        return escaped.into_owned();
    }
    escaped.replace('{', "&#123;").replace('}', "&#125;")
}

/// `Randomization Plan_<protocol no>.docx`, or the draft placeholder when
/// no protocol number is known.
pub fn output_file_name(protocol_no: &str) -> String {
    let stem: String = protocol_no
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem.is_empty() { OUTPUT_PLACEHOLDER } else { stem.as_str() };
    format!("{OUTPUT_PREFIX}{stem}{OUTPUT_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::template::archive::tests::{build_docx, document_xml};
    use crate::pipeline::template::scanner::scan_tokens;
    use std::io::{Cursor, Read};

    fn template(parts: &[(&str, &str)]) -> (TemplateDocument, TokenSet) {
        let doc = TemplateDocument::from_bytes(build_docx(parts)).unwrap();
        let tokens = scan_tokens(&doc);
        (doc, tokens)
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn read_member(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn missing_site_is_reported() {
        let body = document_xml(&["{{PROTOCOL_NO}}", "{{SITE}}"]);
        let (doc, tokens) = template(&[("word/document.xml", body.as_str())]);

        match render(&doc, &tokens, &values(&[("PROTOCOL_NO", "ABC-123")])) {
            Err(TemplateError::MissingTokens(missing)) => assert_eq!(missing, vec!["SITE"]),
            other => panic!("expected MissingTokens, got {other:?}"),
        }
    }

    #[test]
    fn missing_list_is_the_exact_difference_in_scan_order() {
        let body = document_xml(&["{{C}} {{A}} {{B}} {{A}}"]);
        let (doc, tokens) = template(&[("word/document.xml", body.as_str())]);

        let missing = missing_tokens(&tokens, &values(&[("A", "1")]));
        assert_eq!(missing, vec!["C", "B"]);
        assert!(render(&doc, &tokens, &values(&[("A", "1")])).is_err());
    }

    #[test]
    fn empty_string_is_not_missing() {
        let body = document_xml(&["[{{SITE}}]"]);
        let (doc, tokens) = template(&[("word/document.xml", body.as_str())]);

        let out = render(&doc, &tokens, &values(&[("SITE", "")])).unwrap();
        assert!(read_member(&out, "word/document.xml").contains("[]"));
    }

    #[test]
    fn renders_body_header_and_footer() {
        let body = document_xml(&["Protocol {{PROTOCOL_NO}}", "{{ Sponsor }}"]);
        let (doc, tokens) = template(&[
            ("word/document.xml", body.as_str()),
            ("word/header1.xml", "<w:hdr><w:t>{{PROTOCOL_NO}} / {{VERSION}}</w:t></w:hdr>"),
            ("word/footer1.xml", "<w:ftr><w:t>{{SPONSOR}}</w:t></w:ftr>"),
            ("word/styles.xml", "<w:styles><w:color w:val=\"FF0000\"/></w:styles>"),
        ]);
        let vals = values(&[
            ("PROTOCOL_NO", "ABC-123"),
            ("VERSION", "1.0"),
            ("Sponsor", "R&D <Pharma>"),
            ("SPONSOR", "Acme"),
        ]);

        let out = render(&doc, &tokens, &vals).unwrap();
        let body = read_member(&out, "word/document.xml");
        assert!(body.contains("Protocol ABC-123"));
        assert!(body.contains("R&amp;D &lt;Pharma&gt;"));
        assert_eq!(
            read_member(&out, "word/header1.xml"),
            "<w:hdr><w:t>ABC-123 / 1.0</w:t></w:hdr>"
        );
        assert_eq!(read_member(&out, "word/footer1.xml"), "<w:ftr><w:t>Acme</w:t></w:ftr>");
        assert_eq!(
            read_member(&out, "word/styles.xml"),
            "<w:styles><w:color w:val=\"FF0000\"/></w:styles>"
        );
    }

    #[test]
    fn no_residual_delimiters_after_render() {
        let body = document_xml(&["{{A}}{{B}}", "{{PRO</w:t><w:t>TOCOL_NO}}"]);
        let (doc, tokens) = template(&[("word/document.xml", body.as_str())]);
        let vals = values(&[("A", "{{"), ("B", "}}x"), ("PROTOCOL_NO", "P-1")]);

        let out = render(&doc, &tokens, &vals).unwrap();
        let rendered = read_member(&out, "word/document.xml");
        assert!(!rendered.contains("{{"));
        assert!(!rendered.contains("}}"));
        assert!(rendered.contains("P-1"));
    }

    #[test]
    fn unclosed_delimiter_names_the_part() {
        let (doc, tokens) = template(&[
            ("word/document.xml", "<w:t>fine</w:t>"),
            ("word/footer2.xml", "<w:t>Page {{PAGE</w:t>"),
        ]);
        assert!(tokens.is_empty());

        match render(&doc, &tokens, &BTreeMap::new()) {
            Err(TemplateError::MalformedPart { part, explanations, .. }) => {
                assert_eq!(part, "word/footer2.xml");
                assert_eq!(explanations.len(), 1);
                assert!(explanations[0].contains("{{PAGE"));
            }
            other => panic!("expected MalformedPart, got {other:?}"),
        }
    }

    #[test]
    fn template_without_tokens_renders_unchanged_parts() {
        let body = document_xml(&["static text"]);
        let (doc, tokens) = template(&[("word/document.xml", body.as_str())]);
        let out = render(&doc, &tokens, &BTreeMap::new()).unwrap();
        assert_eq!(read_member(&out, "word/document.xml"), body);
    }

    #[test]
    fn file_name_uses_protocol_number() {
        assert_eq!(output_file_name("ABC-123"), "Randomization Plan_ABC-123.docx");
        assert_eq!(output_file_name("  "), "Randomization Plan_draft.docx");
        assert_eq!(output_file_name("A/B:1"), "Randomization Plan_A_B_1.docx");
    }
}
