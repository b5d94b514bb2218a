//! Response parsing: pull three ranked field names out of model output.
//!
//! Models mostly follow the requested format, but not always: some drop
//! the numbering, some add a preamble, some wrap the header in bold. The
//! parser therefore runs a short, ordered list of independent strategies
//! over the answer block and keeps the best one.
//!
//! ## Selection rule
//!
//! The first strategy that yields at least three candidates wins. If none
//! does, the one with the most candidates wins, ties going to the earlier
//! strategy. At most three entries are returned; fewer is a legitimate
//! outcome the caller must handle.

use once_cell::sync::Lazy;
use regex::Regex;

/// Number of fields a complete classification contains.
pub const EXPECTED_FIELDS: usize = 3;

static RE_RESULT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Kết\s*quả\s*:?(.*)$").unwrap());

static RE_NUMBERED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.\s*(.+?)\s*$").unwrap());

/// Characters trimmed around a numbered entry.
const ENTRY_DECORATION: &[char] = &[' ', '-', '•', '\t'];

/// A single way of reading candidates out of the answer block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Lines of the form `N. text`.
    Numbered,
    /// Every line with real content, in order.
    PlainLines,
}

/// Strategies in priority order.
pub const STRATEGIES: [Strategy; 2] = [Strategy::Numbered, Strategy::PlainLines];

impl Strategy {
    /// Run this strategy over `block`.
    pub fn candidates(self, block: &str) -> Vec<String> {
        match self {
            Strategy::Numbered => numbered_lines(block),
            Strategy::PlainLines => plain_lines(block),
        }
    }
}

/// Extract up to three ranked fields from a raw model response.
pub fn parse_top3(response: &str) -> Vec<String> {
    let block = answer_block(response);

    let mut best: Vec<String> = Vec::new();
    for strategy in STRATEGIES {
        let candidates = strategy.candidates(block);
        if candidates.len() >= EXPECTED_FIELDS {
            best = candidates;
            break;
        }
        if candidates.len() > best.len() {
            best = candidates;
        }
    }

    best.truncate(EXPECTED_FIELDS);
    best
}

/// The text after the first `Kết quả` marker, or the whole response.
pub fn answer_block(response: &str) -> &str {
    RE_RESULT_MARKER
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(response)
}

fn numbered_lines(block: &str) -> Vec<String> {
    RE_NUMBERED_LINE
        .captures_iter(block)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(ENTRY_DECORATION))
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn plain_lines(block: &str) -> Vec<String> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| !is_decoration_only(line))
        .map(str::to_string)
        .collect()
}

/// Markdown leftovers such as the `**` closing a bold header carry no field.
fn is_decoration_only(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_whitespace() || matches!(c, '*' | '#' | '-' | '•' | ':' | '_'))
}
