//! Optional client-side topic filter.
//!
//! When enabled, a question must mention at least one configured keyword
//! (case-insensitive substring match) before it is sent to the answering
//! service. Disabled by default; topic enforcement normally lives in the
//! service itself.

use serde::Deserialize;

/// Reply shown when a question is rejected by the filter.
pub const OFF_TOPIC_REPLY: &str = "Please ask company related questions only.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordFilter {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl KeywordFilter {
    #[must_use]
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            enabled: true,
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `question` may be forwarded. Always true while disabled or
    /// when no non-blank keywords are configured.
    #[must_use]
    pub fn allows(&self, question: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let keywords: Vec<String> = self
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return true;
        }
        let question = question.to_lowercase();
        keywords.iter().any(|k| question.contains(k.as_str()))
    }
}
