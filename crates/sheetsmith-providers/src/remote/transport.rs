//! Completion transport
//!
//! `CompletionTransport` is the seam between prompt construction and the
//! wire. `HttpTransport` speaks the OpenAI-compatible chat completions
//! protocol used by OpenRouter and DeepSeek.

use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const ERROR_BODY_LIMIT: usize = 320;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions
    System,
    /// User content
    User,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role
    pub role: ChatRole,
    /// Text
    pub content: String,
}

impl ChatMessage {
    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Chat completion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
}

/// Sends a completion request and returns the reply text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Perform one completion
    ///
    /// # Errors
    /// Returns a [`ProviderError`] for transport, status or decode failures
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    api_key_env: String,
}

impl HttpTransport {
    /// Create transport for `{base_url}/chat/completions`
    ///
    /// A missing key is reported on first use, not here.
    ///
    /// # Errors
    /// Returns `Network` if the base URL is invalid or the client cannot be
    /// built
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        api_key_env: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let endpoint = chat_endpoint(base_url)?;
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_key_env: api_key_env.into(),
        })
    }

    /// Full completions URL
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn chat_endpoint(base_url: &str) -> Result<Url, ProviderError> {
    let base = format!("{}/", base_url.trim().trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|u| u.join("chat/completions"))
        .map_err(|e| ProviderError::Network(format!("invalid base URL '{base_url}': {e}")))
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn status_error(status: StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::Auth {
            status: status.as_u16(),
        },
        429 => ProviderError::Quota {
            status: status.as_u16(),
        },
        code => ProviderError::Http {
            status: code,
            body: truncate(body.trim(), ERROR_BODY_LIMIT),
        },
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCredential(self.api_key_env.clone()))?;

        debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            prompt_chars = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "sending completion request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("missing choices[0].message.content".into())
            })
    }
}
