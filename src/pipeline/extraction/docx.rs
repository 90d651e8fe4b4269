use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

use super::ExtractionError;
use crate::config::MAX_PART_BYTES;
use crate::pipeline::template::archive::check_member_sizes;

/// Plain text of a DOCX body through the docx-rs document tree.
///
/// One line per non-empty paragraph. Runs are concatenated, tabs become
/// `\t` and breaks `\n`. Each table row becomes one line with its cells
/// separated by tabs, so `label<TAB>value` layouts read like labelled
/// lines. Headers and footers are not part of the result.
pub struct DocxTextExtractor;

impl DocxTextExtractor {
    pub fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        check_member_sizes(bytes, MAX_PART_BYTES)
            .map_err(|e| ExtractionError::DocxParsing(e.to_string()))?;

        let docx = read_docx(bytes).map_err(|e| ExtractionError::DocxParsing(e.to_string()))?;

        let mut lines = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(para) => push_line(&mut lines, paragraph_text(para)),
                DocumentChild::Table(table) => table_lines(table, &mut lines),
                _ => {}
            }
        }
        Ok(lines.join("\n"))
    }
}

fn push_line(lines: &mut Vec<String>, line: String) {
    if !line.trim().is_empty() {
        lines.push(line);
    }
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut out = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => out.push_str(&t.text),
                    RunChild::Tab(_) => out.push('\t'),
                    RunChild::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
    }
    out
}

fn table_lines(table: &Table, lines: &mut Vec<String>) {
    for TableChild::TableRow(row) in &table.rows {
        let mut cells = Vec::new();
        for TableRowChild::TableCell(cell) in &row.cells {
            let mut paras = Vec::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(para) => push_line(&mut paras, paragraph_text(para)),
                    // Nested tables keep their own rows.
                    TableCellContent::Table(inner) => table_lines(inner, lines),
                    _ => {}
                }
            }
            cells.push(paras.join(" "));
        }
        push_line(lines, cells.join("\t"));
    }
}
