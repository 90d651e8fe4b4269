use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::normalize::{collapse_whitespace, phase_prefix, strip_trailing_punctuation};
use crate::models::FieldKey;

/// Post-match transform. Returning `None` keeps the raw candidate.
pub type Normalizer = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// One pattern in a field's fallback chain.
#[derive(Clone)]
pub struct ExtractionRule {
    pub label: &'static str,
    pub pattern: Regex,
    pub normalizer: Option<Normalizer>,
}

impl fmt::Debug for ExtractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionRule")
            .field("label", &self.label)
            .field("pattern", &self.pattern.as_str())
            .field("normalizer", &self.normalizer.is_some())
            .finish()
    }
}

impl ExtractionRule {
    pub fn new(label: &'static str, pattern: Regex) -> Self {
        Self {
            label,
            pattern,
            normalizer: None,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Candidate from the first match in `text`: the first capture group
    /// when it took part in the match, otherwise the whole match. Trimmed.
    /// A blank first match means the rule did not match; later matches of
    /// the same pattern are never consulted.
    pub fn candidate(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let m = caps.get(1).or_else(|| caps.get(0))?;
        let value = m.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Run the normalizer; a declined or blank result keeps the candidate.
    pub fn normalize(&self, candidate: String) -> String {
        match &self.normalizer {
            Some(normalizer) => normalizer(&candidate)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(candidate),
            None => candidate,
        }
    }

    /// Candidate plus normalization, or `None` when the rule does not match.
    pub fn apply(&self, text: &str) -> Option<String> {
        self.candidate(text).map(|c| self.normalize(c))
    }
}

/// A field and its ordered rule chain.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub rules: Vec<ExtractionRule>,
}

impl FieldSpec {
    pub fn new(key: FieldKey, rules: Vec<ExtractionRule>) -> Self {
        Self { key, rules }
    }
}

fn rule(label: &'static str, regex_str: &str) -> ExtractionRule {
    ExtractionRule::new(
        label,
        Regex::new(regex_str).expect("Invalid field extraction pattern"),
    )
}

fn normalizer(f: fn(&str) -> Option<String>) -> Normalizer {
    Arc::new(f)
}

/// Built-in chains. Within a field the first rule that matches wins, so the
/// order encodes which labelling convention is authoritative. Labels may
/// carry a parenthesised gloss, as in `시험책임자 (PI):`.
pub static BUILTIN_SPECS: LazyLock<Vec<FieldSpec>> = LazyLock::new(|| {
    let trailing = normalizer(strip_trailing_punctuation);
    let spaces = normalizer(collapse_whitespace);

    vec![
        FieldSpec::new(
            FieldKey::ProtocolNo,
            vec![
                rule(
                    "protocol_no_en",
                    r"(?i:\bprotocol)\s*(?:No\.?|NO\.?|Number|number|#)\)?\s*[:\-]?\s*([A-Za-z0-9_\-./]*[0-9][A-Za-z0-9_\-./]*)",
                )
                .with_normalizer(trailing.clone()),
                rule(
                    "protocol_no_ko",
                    concat!(
                        r"시험계획서\s*번호",
                        r"(?:\s*\([^)\n]*\))?",
                        r"\s*[:\-]?\s*([A-Za-z0-9_\-./]*[0-9][A-Za-z0-9_\-./]*)"
                    ),
                )
                .with_normalizer(trailing.clone()),
            ],
        ),
        FieldSpec::new(
            FieldKey::Phase,
            vec![
                rule(
                    "phase_en",
                    r"\b(?i:phase)\s*([0-9]+[abAB]?(?:\s*/\s*[0-9]+[abAB]?)?|[IVX]+[abAB]?(?:\s*/\s*[IVX]+[abAB]?)?)\b",
                )
                .with_normalizer(normalizer(phase_prefix)),
                // No capture group: the whole `제N상` span is the value.
                rule("phase_ko", r"제\s*[0-9IVX一-龥]+(?:\s*/\s*[0-9IVX]+)?\s*상")
                    .with_normalizer(normalizer(phase_prefix)),
            ],
        ),
        FieldSpec::new(
            FieldKey::Version,
            vec![
                rule(
                    "version_en",
                    r"(?i:\bversion)(?:\s*No\.?)?\s*[:\-]?\s*([0-9][0-9A-Za-z.\-]*)",
                )
                .with_normalizer(trailing.clone()),
                rule("version_ko", r"버전\s*[:\-]?\s*([0-9][0-9A-Za-z.\-]*)")
                    .with_normalizer(trailing),
            ],
        ),
        FieldSpec::new(
            FieldKey::Sponsor,
            vec![
                rule(
                    "sponsor_ko",
                    concat!(r"(?m)(?:임상시험)?의뢰자", r"(?:\s*\([^)\n]*\))?", r"(?:[ \t]*[:\-][ \t]*|[ \t]+)(.+?)\s*$"),
                ),
                rule(
                    "sponsor_en",
                    concat!(r"(?mi)^\s*sponsor(?:\s+name)?", r"(?:\s*\([^)\n]*\))?", r"(?:[ \t]*[:\-][ \t]*|\t[ \t]*)(.+?)\s*$"),
                ),
            ],
        ),
        FieldSpec::new(
            FieldKey::Site,
            vec![
                rule(
                    "site_ko",
                    concat!(r"(?m)임상시험\s*실시\s*기관", r"(?:\s*\([^)\n]*\))?", r"(?:[ \t]*[:\-][ \t]*|[ \t]+)(.+?)\s*$"),
                ),
                rule(
                    "site_en",
                    concat!(r"(?mi)^\s*(?:study\s+|trial\s+)?sites?", r"(?:\s*\([^)\n]*\))?", r"(?:[ \t]*[:\-][ \t]*|\t[ \t]*)(.+?)\s*$"),
                ),
            ],
        ),
        FieldSpec::new(
            FieldKey::Pi,
            vec![
                rule(
                    "pi_ko",
                    concat!(r"(?m)시험\s*책임자", r"(?:\s*\([^)\n]*\))?", r"(?:[ \t]*[:\-][ \t]*|[ \t]+)(.+?)\s*$"),
                ),
                rule(
                    "pi_en",
                    concat!(
                        r"(?mi)^\s*(?:principal\s+investigator|PI)",
                        r"(?:\s*\([^)\n]*\))?",
                        r"(?:[ \t]*[:\-][ \t]*|\t[ \t]*)(.+?)\s*$"
                    ),
                ),
            ],
        ),
        FieldSpec::new(
            FieldKey::KorTitle,
            vec![rule(
                "kor_title_ko",
                concat!(
                    r"(?m)^\s*(?:국문\s*)?(?:시험\s*제목|임상시험명|제목)",
                    r"(?:\s*\([^)\n]*\))?",
                    r"\s*[:\-]?\s*(.+?)\s*$"
                ),
            )
            .with_normalizer(spaces.clone())],
        ),
        FieldSpec::new(
            FieldKey::EngTitle,
            vec![
                rule(
                    "eng_title_open_label",
                    r"(?m)^\s*((?:An?|The)\s+(?i:open-label|randomi[sz]ed|double-blind|single-blind|multi-?cent(?:er|re)|phase)\b.{30,}?)\s*$",
                )
                .with_normalizer(spaces.clone()),
                rule(
                    "eng_title_label",
                    concat!(r"(?mi)^\s*(?:study\s+|protocol\s+|english\s+)?title", r"(?:\s*\([^)\n]*\))?", r"\s*[:\-]\s*(.+?)\s*$"),
                )
                .with_normalizer(spaces),
            ],
        ),
        FieldSpec::new(
            FieldKey::Arms,
            vec![
                rule(
                    "arms_en",
                    concat!(
                        r"(?mi)^\s*(?:number\s+of\s+)?(?:treatment\s+)?arms?",
                        r"(?:\s*\([^)\n]*\))?",
                        r"\s*[:\-]\s*(.+?)\s*$"
                    ),
                ),
                rule(
                    "arms_ko",
                    concat!(r"(?m)^\s*(?:투여\s*군|치료\s*군)(?:\s*수)?", r"(?:\s*\([^)\n]*\))?", r"\s*[:\-]\s*(.+?)\s*$"),
                ),
            ],
        ),
        FieldSpec::new(
            FieldKey::Sequences,
            vec![
                rule(
                    "sequences_en",
                    concat!(
                        r"(?mi)^\s*(?:number\s+of\s+)?(?:treatment\s+)?sequences?",
                        r"(?:\s*\([^)\n]*\))?",
                        r"\s*[:\-]\s*(.+?)\s*$"
                    ),
                ),
                rule(
                    "sequences_ko",
                    concat!(r"(?m)^\s*순서\s*군(?:\s*수)?", r"(?:\s*\([^)\n]*\))?", r"\s*[:\-]\s*(.+?)\s*$"),
                ),
            ],
        ),
        FieldSpec::new(
            FieldKey::NPerArm,
            vec![
                rule(
                    "n_per_arm_en",
                    r"(?i)\b([0-9]+)\s+(?:subjects|patients|participants)\s+(?:per|in\s+each)\s+(?:arm|group|sequence)\b",
                ),
                rule(
                    "n_per_arm_ko",
                    r"(?:각\s*)?군당\s*(?:대상자\s*수?\s*[:\-]?\s*)?([0-9]+)",
                ),
            ],
        ),
    ]
});
