use serde::Serialize;

use super::archive::TemplateDocument;
use super::xml::{decode_entities, strip_tags};

pub const TOKEN_OPEN: &str = "{{";
pub const TOKEN_CLOSE: &str = "}}";

/// One `{{NAME}}` span in a part's markup (byte offsets, `end` exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOccurrence {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxFault {
    /// `{{` with no matching `}}` before the next `{{` or the end of the part.
    Unclosed { offset: usize },
    /// `{{}}` or a token whose name is blank once markup is removed.
    Empty { offset: usize },
}

#[derive(Debug, Default)]
pub struct MarkupScan {
    pub occurrences: Vec<TokenOccurrence>,
    pub faults: Vec<SyntaxFault>,
}

/// Scan one part for delimited tokens.
///
/// Every opener pairs with the nearest closer. Word often splits a token
/// across several runs, so tags between the delimiters are dropped before
/// the name is read.
pub fn scan_markup(markup: &str) -> MarkupScan {
    let mut scan = MarkupScan::default();
    let mut pos = 0;

    while let Some(rel) = markup[pos..].find(TOKEN_OPEN) {
        let open = pos + rel;
        let body_start = open + TOKEN_OPEN.len();

        let Some(close_rel) = markup[body_start..].find(TOKEN_CLOSE) else {
            scan.faults.push(SyntaxFault::Unclosed { offset: open });
            break;
        };
        let close = body_start + close_rel;
        let inner = &markup[body_start..close];

        if let Some(nested) = inner.find(TOKEN_OPEN) {
            scan.faults.push(SyntaxFault::Unclosed { offset: open });
            pos = body_start + nested;
            continue;
        }

        let name = token_name(inner);
        if name.is_empty() {
            scan.faults.push(SyntaxFault::Empty { offset: open });
        } else {
            scan.occurrences.push(TokenOccurrence {
                name,
                start: open,
                end: close + TOKEN_CLOSE.len(),
            });
        }
        pos = close + TOKEN_CLOSE.len();
    }

    scan
}

fn token_name(inner: &str) -> String {
    decode_entities(&strip_tags(inner)).trim().to_string()
}

/// Human-readable description of a fault, with nearby text for context.
pub fn explain_fault(markup: &str, fault: &SyntaxFault) -> String {
    let (offset, what) = match fault {
        SyntaxFault::Unclosed { offset } => (*offset, "unclosed '{{'"),
        SyntaxFault::Empty { offset } => (*offset, "empty token '{{}}'"),
    };
    let context = context_after(markup, offset);
    format!("{what} at byte {offset} near \"{context}\"")
}

fn context_after(markup: &str, offset: usize) -> String {
    let mut end = (offset + 160).min(markup.len());
    while !markup.is_char_boundary(end) {
        end -= 1;
    }
    let text = strip_tags(&markup[offset..end]);
    text.chars().take(40).collect()
}

/// Distinct token names of a template, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TokenSet {
    tokens: Vec<String>,
}

impl TokenSet {
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.tokens.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tokens.iter().any(|t| t == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Collect every token across body, header and footer parts.
///
/// Never fails: unreadable bytes are replaced and syntax faults are left
/// for the render step to report.
pub fn scan_tokens(doc: &TemplateDocument) -> TokenSet {
    let mut set = TokenSet::default();
    for part in doc.parts() {
        let markup = part.markup_lossy();
        for occurrence in scan_markup(&markup).occurrences {
            set.insert(&occurrence.name);
        }
    }
    set
}
