//! Built-in Randomization Plan layout, used when no template is loaded.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::archive::TemplateDocument;
use super::xml::escape_text;
use super::TemplateError;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#,
    r#"<Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>"#,
    r#"</Types>"#,
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#,
);

const DOCUMENT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>"#,
    r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/>"#,
    r#"</Relationships>"#,
);

const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/>"#,
    r#"<w:rPr><w:sz w:val="20"/></w:rPr></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/>"#,
    r#"<w:basedOn w:val="Normal"/><w:next w:val="Normal"/>"#,
    r#"<w:pPr><w:keepNext/><w:spacing w:before="260" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr>"#,
    r#"<w:rPr><w:b/><w:i w:val="0"/><w:color w:val="000000"/><w:sz w:val="28"/></w:rPr></w:style>"#,
    r#"</w:styles>"#,
);

const FOOTER_NOTICE: &str =
    "CONFIDENTIAL \u{2014} This document contains confidential information belonging to the Sponsor.";

/// Labelled metadata lines of the cover block.
const META_LINES: [(&str, &str); 6] = [
    ("시험계획서 번호 (Protocol No.)", "PROTOCOL_NO"),
    ("버전 (Version)", "VERSION"),
    ("시험단계 (Phase)", "PHASE"),
    ("임상시험실시기관 (Site)", "SITE"),
    ("시험책임자 (PI)", "PI"),
    ("임상시험의뢰자 (Sponsor)", "SPONSOR"),
];

const SECTIONS: [(&str, &str); 4] = [
    (
        "1. 서론",
        "무작위배정계획은 해당 임상시험의 무작위배정 방법과 과정에 대해 설명합니다. (자동 생성 초안)",
    ),
    (
        "2. 무작위배정 절차",
        "업로드한 템플릿/완성본을 참고해 절차 문안을 자동 채워 넣습니다.",
    ),
    (
        "3. 무작위배정 방법",
        "Block randomization 1:1 (초안). 블록크기/순서군/대상자수는 템플릿/프로토콜에서 자동 반영합니다.",
    ),
    (
        "4. 문서의 관리",
        "무작위배정코드/표 관리 및 전달 절차는 완성본을 바탕으로 채워 넣습니다.",
    ),
];

#[derive(Default, Clone, Copy)]
struct RunStyle {
    bold: bool,
    /// Half-points.
    size: Option<u32>,
}

/// Black, upright run.
fn run(text: &str, style: RunStyle) -> String {
    let mut props = String::new();
    if style.bold {
        props.push_str("<w:b/>");
    }
    props.push_str(r#"<w:i w:val="0"/><w:color w:val="000000"/>"#);
    if let Some(size) = style.size {
        props.push_str(&format!(r#"<w:sz w:val="{size}"/>"#));
    }
    format!(
        r#"<w:r><w:rPr>{props}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape_text(text)
    )
}

fn paragraph(props: &str, runs: &[String]) -> String {
    let props = if props.is_empty() {
        String::new()
    } else {
        format!("<w:pPr>{props}</w:pPr>")
    };
    format!("<w:p>{props}{}</w:p>", runs.concat())
}

fn token(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

fn document_xml() -> String {
    let centered = r#"<w:jc w:val="center"/>"#;
    let centered_gap = r#"<w:spacing w:after="300"/><w:jc w:val="center"/>"#;

    let mut body = vec![
        paragraph(
            centered_gap,
            &[run("Randomization Plan", RunStyle { bold: true, size: Some(56) })],
        ),
        paragraph(centered, &[run(&token("KOR_TITLE"), RunStyle { size: Some(22), ..Default::default() })]),
        paragraph(
            centered_gap,
            &[run(&token("ENG_TITLE"), RunStyle { size: Some(21), ..Default::default() })],
        ),
    ];

    for (label, name) in META_LINES {
        body.push(paragraph(
            r#"<w:spacing w:after="80"/>"#,
            &[
                run(&format!("{label}: "), RunStyle { bold: true, ..Default::default() }),
                run(&token(name), RunStyle::default()),
            ],
        ));
    }

    for (heading, text) in SECTIONS {
        body.push(paragraph(
            r#"<w:pStyle w:val="Heading1"/>"#,
            &[run(heading, RunStyle { bold: true, ..Default::default() })],
        ));
        body.push(paragraph("", &[run(text, RunStyle::default())]));
    }

    format!(
        concat!(
            "{decl}<w:document xmlns:w=\"{w}\" xmlns:r=\"{r}\"><w:body>{body}",
            "<w:sectPr><w:headerReference w:type=\"default\" r:id=\"rId2\"/>",
            "<w:footerReference w:type=\"default\" r:id=\"rId3\"/>",
            "<w:pgSz w:w=\"11906\" w:h=\"16838\"/>",
            "<w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" ",
            "w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/></w:sectPr>",
            "</w:body></w:document>"
        ),
        decl = XML_DECL,
        w = W_NS,
        r = R_NS,
        body = body.concat(),
    )
}

fn header_xml() -> String {
    let line = format!(
        "시험계획서 번호: {}    버전: {}",
        token("PROTOCOL_NO"),
        token("VERSION")
    );
    format!(
        "{XML_DECL}<w:hdr xmlns:w=\"{W_NS}\">{}</w:hdr>",
        paragraph(r#"<w:jc w:val="left"/>"#, &[run(&line, RunStyle::default())])
    )
}

fn footer_xml() -> String {
    format!(
        "{XML_DECL}<w:ftr xmlns:w=\"{W_NS}\">{}</w:ftr>",
        paragraph(
            r#"<w:jc w:val="center"/>"#,
            &[run(FOOTER_NOTICE, RunStyle { size: Some(16), ..Default::default() })]
        )
    )
}

/// Serialize the built-in layout as a DOCX archive.
pub fn default_template_bytes() -> Result<Vec<u8>, TemplateError> {
    let members: [(&str, String); 7] = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/document.xml", document_xml()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/styles.xml", STYLES.to_string()),
        ("word/header1.xml", header_xml()),
        ("word/footer1.xml", footer_xml()),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        writer.start_file(name, SimpleFileOptions::default())?;
        writer.write_all(content.as_bytes())?;
    }
    Ok(writer.finish()?.into_inner())
}

pub fn default_template() -> Result<TemplateDocument, TemplateError> {
    TemplateDocument::from_bytes(default_template_bytes()?)
}
