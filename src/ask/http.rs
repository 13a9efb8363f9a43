//! HTTP implementation of [`AnswerSource`].

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{AnswerSource, AskError, AskRequest, AskResponse};

/// Posts questions as JSON to a fixed endpoint.
///
/// # Example
///
/// ```rust,no_run
/// use chat_widget::ask::{AnswerSource, HttpAnswerSource};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpAnswerSource::new("http://127.0.0.1:5001/ask", None)?;
/// let response = source.ask("What does KMTEC do?").await?;
/// println!("{:?}", response.answer);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpAnswerSource {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpAnswerSource {
    /// Create a source for `endpoint`. With `timeout` unset the transport
    /// default applies, which never gives up on a hung service.
    pub fn new(endpoint: impl AsRef<str>, timeout: Option<Duration>) -> Result<Self, AskError> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            endpoint,
            http: builder.build()?,
        })
    }

    /// Create a source with a custom reqwest client.
    pub fn with_client(endpoint: impl AsRef<str>, http: reqwest::Client) -> Result<Self, AskError> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self { endpoint, http })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AnswerSource for HttpAnswerSource {
    async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
        tracing::debug!(endpoint = %self.endpoint, "Posting question");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&AskRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(AskError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
