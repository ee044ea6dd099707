//! `generateContent` client performing one attempt per call.

use super::wire::{ErrorWrapper, GenerateContentRequest, GenerateContentResponse};
use crate::chat::ports::{AttemptError, CompletionClient, GenerationConfig};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Header carrying the API key, kept out of the URL so transport errors
/// never echo it.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Base URL of the model collection.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// [`CompletionClient`] backed by the generative-language REST API.
#[derive(Clone)]
pub struct GeminiCompletionClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiCompletionClient {
    /// Creates a client with the default model and endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// Overrides the model after construction.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the endpoint base URL after construction.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl fmt::Debug for GeminiCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiCompletionClient")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompletionClient for GeminiCompletionClient {
    async fn attempt(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Option<String>, AttemptError> {
        let body = GenerateContentRequest::new(prompt, config);
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .timeout(config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| transport_error(err, config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport_error(err, config.timeout))?;

        Ok(parse_success_body(&bytes))
    }
}

/// Maps a reqwest failure, dropping the request URL from its message.
fn transport_error(err: reqwest::Error, timeout: Duration) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Timeout(timeout)
    } else {
        AttemptError::Network(err.without_url().to_string())
    }
}

/// Extracts the first candidate text, treating an undecodable body as empty.
fn parse_success_body(bytes: &[u8]) -> Option<String> {
    match serde_json::from_slice::<GenerateContentResponse>(bytes) {
        Ok(parsed) => parsed.first_text(),
        Err(err) => {
            debug!(error = %err, "generation response body was not valid JSON");
            None
        }
    }
}

fn map_http_error(status: StatusCode, body: &str) -> AttemptError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_owned());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_owned());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AttemptError::Auth {
            status: status.as_u16(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => AttemptError::Quota(message),
        _ => AttemptError::Status {
            status: status.as_u16(),
            message,
        },
    }
}
