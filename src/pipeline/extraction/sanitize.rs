/// Sanitize extracted text before field extraction.
/// Strips control and invisible formatting characters, normalizes line
/// endings, trims every line and drops blank lines. Hangul, CJK ideographs
/// and typographic symbols pass through untouched.
pub fn sanitize_source_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !is_stripped(*c))
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_stripped(c: char) -> bool {
    if c == '\n' || c == '\t' {
        return false;
    }
    c.is_control()
        || matches!(
            c,
            '\u{FEFF}' // BOM
                | '\u{200B}' // Zero-width space
                | '\u{200C}'
                | '\u{200D}'
                | '\u{2060}' // Word joiner
                | '\u{00AD}' // Soft hyphen
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_null_bytes() {
        let clean = sanitize_source_text("Sponsor: Han\x00Pharma");
        assert_eq!(clean, "Sponsor: HanPharma");
    }

    #[test]
    fn strips_control_characters() {
        let raw = "Protocol No. ABC-123\x01\x02\x03\nPhase 2";
        assert_eq!(sanitize_source_text(raw), "Protocol No. ABC-123\nPhase 2");
    }

    #[test]
    fn normalizes_crlf() {
        assert_eq!(sanitize_source_text("Site: A\r\nPI: B\rC"), "Site: A\nPI: B\nC");
    }

    #[test]
    fn collapses_blank_lines() {
        let raw = "Line one\n\n\n\nLine two\n \n\nLine three";
        assert_eq!(sanitize_source_text(raw), "Line one\nLine two\nLine three");
    }

    #[test]
    fn trims_whitespace_per_line() {
        let raw = "  leading spaces  \n  trailing too  ";
        assert_eq!(sanitize_source_text(raw), "leading spaces\ntrailing too");
    }

    #[test]
    fn preserves_korean_and_symbols() {
        let raw = "제1상 임상시험 – 2×2 crossover, 군당 20명 (µg/kg)";
        assert_eq!(sanitize_source_text(raw), raw);
    }

    #[test]
    fn removes_invisible_characters() {
        let raw = "\u{FEFF}시험계획서\u{200B} 번호: AB\u{00AD}C-1";
        assert_eq!(sanitize_source_text(raw), "시험계획서 번호: ABC-1");
    }

    #[test]
    fn keeps_tabs_inside_lines() {
        assert_eq!(sanitize_source_text("Arms\tA,B"), "Arms\tA,B");
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(sanitize_source_text(""), "");
        assert_eq!(sanitize_source_text("\x00\x01\x02"), "");
    }
}
