//! Text normalisation: collapse raw PDF extraction into one clean line.
//!
//! PDF text extractors emit hard line breaks at every visual line end, runs
//! of spaces where columns were laid out, and a mix of `\r\n`/`\r`/`\n`
//! depending on the producer. None of that carries meaning for the
//! classifier, and it inflates the prompt.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise extracted text.
///
/// 1. Every line break (`\r\n`, `\r`, `\n`) becomes one space.
/// 2. Every whitespace run collapses to one space.
/// 3. Leading and trailing whitespace is trimmed.
///
/// Total and idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    let s = RE_LINE_BREAKS.replace_all(raw, " ");
    let s = RE_WHITESPACE.replace_all(&s, " ");
    s.trim().to_string()
}
