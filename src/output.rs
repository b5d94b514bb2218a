//! Output types: the classification result and how it is shown.

use crate::i18n::{Locale, Message};
use crate::pipeline::parse::EXPECTED_FIELDS;
use crate::prompts::is_known_field;
use serde::{Deserialize, Serialize};

/// Exactly three ranked job fields.
///
/// Only constructible from three non-empty entries, so a value of this type
/// is always a complete classification. Entries are expected to come from
/// [`crate::prompts::TAXONOMY`] but this is not enforced; see
/// [`ClassificationResult::off_taxonomy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    fields: [String; EXPECTED_FIELDS],
}

impl ClassificationResult {
    /// Build a result from parser output. Returns `None` unless there are
    /// exactly three non-blank entries.
    pub fn from_entries(entries: &[String]) -> Option<Self> {
        match entries {
            [a, b, c] if entries.iter().all(|e| !e.trim().is_empty()) => Some(Self {
                fields: [a.clone(), b.clone(), c.clone()],
            }),
            _ => None,
        }
    }

    /// The three fields, best match first.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Entries that are not exact taxonomy names.
    pub fn off_taxonomy(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(String::as_str)
            .filter(|f| !is_known_field(f))
            .collect()
    }

    /// Render as the header line plus three numbered lines.
    pub fn render(&self, locale: Locale) -> String {
        let mut out = String::from(locale.text(Message::ResultsLabel));
        for (i, field) in self.fields.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, field));
        }
        out
    }
}

/// What a classification run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationOutcome {
    /// Three fields were parsed and stored as the session's result.
    Classified { result: ClassificationResult },
    /// Fewer than three fields were parsed. The session result is left as
    /// it was; `raw` is the model response to show instead.
    Shortfall { entries: Vec<String>, raw: String },
}

impl ClassificationOutcome {
    pub fn is_classified(&self) -> bool {
        matches!(self, ClassificationOutcome::Classified { .. })
    }
}

/// Render the results panel: the stored result or the empty-state message.
pub fn render_results(result: Option<&ClassificationResult>, locale: Locale) -> String {
    match result {
        Some(r) => r.render(locale),
        None => locale.text(Message::EmptyState).to_string(),
    }
}
