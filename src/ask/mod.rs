//! Question answering client.
//!
//! This module is the widget's only link to the outside world: one POST per
//! submitted question, one [`Reply`] per POST.
//!
//! # Overview
//!
//! The [`AnswerSource`] trait abstracts the remote question-answering
//! service. [`HttpAnswerSource`] talks to it over HTTP; tests substitute
//! their own implementations. [`ResponseFetcher`] turns whatever the source
//! returns (answer, missing answer, or failure) into the text that ends up in
//! the transcript.
//!
//! # Wire format
//!
//! ```text
//! POST /ask
//! Content-Type: application/json
//!
//! {"question": "Where is the head office?"}
//!
//! 200 OK
//! {"answer": "Colombo", "sources": "..."}
//! ```

mod http;

pub use http::HttpAnswerSource;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interim text shown while a question is in flight.
pub const THINKING_TEXT: &str = "Thinking...";
/// Reply when the service answered without an `answer`.
pub const FALLBACK_ANSWER: &str = "I don't know.";
/// Reply when the call failed for any reason.
pub const ERROR_REPLY: &str = "Oops! Something went wrong. Please try again.";

/// Request body sent to the answering service.
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

/// Response body from the answering service. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: Option<String>,
}

/// Ways a single ask can fail.
#[derive(Debug, Error)]
pub enum AskError {
    /// Connection, DNS, timeout or body read failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-2xx status.
    #[error("answering service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON.
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configured endpoint is not a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A remote question-answering service.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Ask one independent question.
    async fn ask(&self, question: &str) -> Result<AskResponse, AskError>;
}

/// Final text for a placeholder entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub is_error: bool,
}

impl Reply {
    #[must_use]
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    #[must_use]
    pub fn error() -> Self {
        Self {
            text: ERROR_REPLY.to_string(),
            is_error: true,
        }
    }
}

/// Runs one ask against an [`AnswerSource`] and never fails: every outcome
/// is folded into a [`Reply`].
#[derive(Clone)]
pub struct ResponseFetcher {
    source: Arc<dyn AnswerSource>,
}

impl std::fmt::Debug for ResponseFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFetcher").finish_non_exhaustive()
    }
}

impl ResponseFetcher {
    pub fn new(source: Arc<dyn AnswerSource>) -> Self {
        Self { source }
    }

    /// Ask `question` and map the outcome to a transcript reply.
    pub async fn fetch(&self, question: &str) -> Reply {
        match self.source.ask(question).await {
            Ok(response) => Self::reply_for(response),
            Err(e) => {
                tracing::error!(
                    name: "widget.reply.failed",
                    error = %e,
                    question_length = question.len(),
                    "Failed to fetch answer"
                );
                Reply::error()
            }
        }
    }

    fn reply_for(response: AskResponse) -> Reply {
        match response.answer {
            Some(answer) if !answer.trim().is_empty() => Reply::answer(answer),
            _ => Reply::answer(FALLBACK_ANSWER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(fn() -> Result<AskResponse, AskError>);

    #[async_trait]
    impl AnswerSource for Fixed {
        async fn ask(&self, _question: &str) -> Result<AskResponse, AskError> {
            (self.0)()
        }
    }

    fn fetcher(f: fn() -> Result<AskResponse, AskError>) -> ResponseFetcher {
        ResponseFetcher::new(Arc::new(Fixed(f)))
    }

    #[tokio::test]
    async fn test_answer_is_passed_through() {
        let reply = fetcher(|| {
            Ok(AskResponse {
                answer: Some("Paris".into()),
            })
        })
        .fetch("capital of France?")
        .await;
        assert_eq!(reply, Reply::answer("Paris"));
    }

    #[tokio::test]
    async fn test_missing_or_blank_answer_falls_back() {
        let reply = fetcher(|| Ok(AskResponse::default())).fetch("q").await;
        assert_eq!(reply.text, FALLBACK_ANSWER);
        assert!(!reply.is_error);

        let reply = fetcher(|| {
            Ok(AskResponse {
                answer: Some("   ".into()),
            })
        })
        .fetch("q")
        .await;
        assert_eq!(reply.text, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_failure_becomes_error_reply() {
        let reply = fetcher(|| {
            Err(AskError::Status {
                status: 500,
                body: String::new(),
            })
        })
        .fetch("q")
        .await;
        assert_eq!(reply.text, ERROR_REPLY);
        assert!(reply.is_error);
    }

    #[test]
    fn test_response_ignores_extra_fields() {
        let parsed: AskResponse =
            serde_json::from_str(r#"{"answer": "Yes", "sources": "doc.pdf"}"#).unwrap();
        assert_eq!(parsed.answer.as_deref(), Some("Yes"));

        let empty: AskResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.answer.is_none());
    }
}
