//! Field-specific post-match transforms.
//!
//! Every normalizer returns `None` to decline, in which case the raw
//! candidate is kept.

/// Korean ordinal marker that opens a phase written as `제N상`.
const KOREAN_ORDINAL: char = '제';
const PHASE_PREFIX: &str = "Phase ";

/// `"2"` becomes `"Phase 2"`; `"제1상"` and `"Phase II"` are left alone.
pub fn phase_prefix(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty()
        || value.starts_with(KOREAN_ORDINAL)
        || value.to_ascii_lowercase().starts_with("phase")
    {
        return None;
    }
    Some(format!("{PHASE_PREFIX}{value}"))
}

/// Drop sentence punctuation that a greedy identifier match picked up.
pub fn strip_trailing_punctuation(value: &str) -> Option<String> {
    let stripped = value.trim_end_matches(['.', ',', ';', ':', '-', '/', '_', ')']);
    (stripped.len() != value.len() && !stripped.is_empty()).then(|| stripped.to_string())
}

/// Collapse runs of whitespace left by PDF column layout.
pub fn collapse_whitespace(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    (collapsed != value).then_some(collapsed)
}
