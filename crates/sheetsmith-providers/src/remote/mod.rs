//! Remote model provider
//!
//! One provider per configured endpoint. In two-stage mode an analysis call
//! (analysis-stage model, low temperature) precedes the generation call, and
//! its narrative is folded into the generation prompt.

pub mod prompt;
pub mod response;
pub mod transport;

pub use transport::{ChatMessage, ChatRole, CompletionRequest, CompletionTransport, HttpTransport};

use crate::error::ProviderError;
use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use sheetsmith_model::{GeneratedCode, GenerationRequest, StageModels};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Temperature of the analysis stage
pub const ANALYSIS_TEMPERATURE: f32 = 0.1;
/// Default completion token cap
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
/// Default generation temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// OpenRouter API base
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// DeepSeek API base
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_two_stage() -> bool {
    true
}

/// Remote endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEndpointConfig {
    /// Provider id used in the priority list
    pub id: String,
    /// API base URL; `/chat/completions` is appended
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Inline key, takes precedence over the environment
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Completion token cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Generation temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Run the analysis stage before generation
    #[serde(default = "default_two_stage")]
    pub two_stage: bool,
}

impl RemoteEndpointConfig {
    /// Create endpoint with default limits
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            api_key_env: api_key_env.into(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            two_stage: true,
        }
    }

    /// OpenRouter endpoint
    #[must_use]
    pub fn openrouter() -> Self {
        Self::new("openrouter", OPENROUTER_BASE_URL, "OPENROUTER_API_KEY")
    }

    /// DeepSeek endpoint
    #[must_use]
    pub fn deepseek() -> Self {
        Self::new("deepseek", DEEPSEEK_BASE_URL, "DEEPSEEK_API_KEY")
    }

    /// Set inline key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Skip the analysis stage
    #[must_use]
    pub fn single_stage(mut self) -> Self {
        self.two_stage = false;
        self
    }

    /// Generation temperature clamped to [0.1, 1.0]
    #[must_use]
    pub fn effective_temperature(&self) -> f32 {
        if self.temperature.is_nan() {
            DEFAULT_TEMPERATURE
        } else {
            self.temperature.clamp(0.1, 1.0)
        }
    }
}

/// Provider backed by an external model endpoint
pub struct RemoteModelProvider {
    id: ProviderId,
    endpoint: RemoteEndpointConfig,
    defaults: StageModels,
    entry_point: String,
    transport: Arc<dyn CompletionTransport>,
}

impl fmt::Debug for RemoteModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteModelProvider")
            .field("id", &self.id)
            .field("base_url", &self.endpoint.base_url)
            .field("two_stage", &self.endpoint.two_stage)
            .finish_non_exhaustive()
    }
}

impl RemoteModelProvider {
    /// Create provider
    ///
    /// `defaults` resolves stage models the request leaves unset.
    #[must_use]
    pub fn new(
        endpoint: RemoteEndpointConfig,
        defaults: StageModels,
        transport: Arc<dyn CompletionTransport>,
    ) -> Self {
        Self {
            id: ProviderId::new(&endpoint.id),
            endpoint,
            defaults,
            entry_point: "main".to_string(),
            transport,
        }
    }

    /// Entry point named in the generation prompt
    #[must_use]
    pub fn with_entry_point(mut self, function: impl Into<String>) -> Self {
        self.entry_point = function.into();
        self
    }

    /// Provider id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ProviderId {
        &self.id
    }

    /// Endpoint settings
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &RemoteEndpointConfig {
        &self.endpoint
    }

    /// Run the analysis (optional) and generation calls
    ///
    /// # Errors
    /// Transport failures and replies with no extractable code
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedCode, ProviderError> {
        let models = request.models.resolve(&self.defaults);
        let instructions = request.effective_instructions();
        let profile = &request.profile;

        let analysis = if self.endpoint.two_stage {
            let call = CompletionRequest {
                model: models.analysis.clone(),
                messages: prompt::analysis_messages(profile, instructions),
                temperature: ANALYSIS_TEMPERATURE,
                max_tokens: self.endpoint.max_tokens,
            };
            let narrative = self.transport.complete(&call).await?;
            debug!(provider = %self.id, chars = narrative.len(), "analysis stage complete");
            Some(narrative)
        } else {
            None
        };

        let call = CompletionRequest {
            model: models.generation,
            messages: prompt::generation_messages(
                profile,
                instructions,
                analysis.as_deref(),
                &self.entry_point,
            ),
            temperature: self.endpoint.effective_temperature(),
            max_tokens: self.endpoint.max_tokens,
        };
        let reply = self.transport.complete(&call).await?;
        debug!(provider = %self.id, chars = reply.len(), "generation stage complete");
        response::extract(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::transport::MockCompletionTransport;
    use sheetsmith_model::{ModelSelection, Profile};

    const REPLY: &str = "FILENAME: app.py\nCONTENT:\nimport streamlit as st\n====\nFILENAME: requirements.txt\nCONTENT:\nstreamlit\n====\n";

    fn defaults() -> StageModels {
        StageModels::new("default-analysis", "default-generation")
    }

    #[tokio::test]
    async fn two_stage_uses_both_models() {
        let mut mock = MockCompletionTransport::new();
        mock.expect_complete()
            .withf(|r| r.model == "default-analysis" && (r.temperature - ANALYSIS_TEMPERATURE).abs() < f32::EPSILON)
            .times(1)
            .returning(|_| Ok("The workbook tracks expenses.".into()));
        mock.expect_complete()
            .withf(|r| {
                r.model == "gen-override"
                    && r.messages[1].content.contains("The workbook tracks expenses.")
            })
            .times(1)
            .returning(|_| Ok(REPLY.into()));

        let provider = RemoteModelProvider::new(
            RemoteEndpointConfig::openrouter(),
            defaults(),
            Arc::new(mock),
        );
        let request = GenerationRequest::new(Profile::new()).with_models(ModelSelection {
            analysis: None,
            generation: Some("gen-override".into()),
        });

        let code = provider.generate(&request).await.unwrap();
        assert_eq!(code.source, "import streamlit as st");
        assert_eq!(code.declared.names().collect::<Vec<_>>(), vec!["streamlit"]);
    }

    #[tokio::test]
    async fn single_stage_makes_one_call() {
        let mut mock = MockCompletionTransport::new();
        mock.expect_complete()
            .withf(|r| r.model == "default-generation")
            .times(1)
            .returning(|_| Ok(REPLY.into()));

        let provider = RemoteModelProvider::new(
            RemoteEndpointConfig::deepseek().single_stage(),
            defaults(),
            Arc::new(mock),
        );
        assert!(provider
            .generate(&GenerationRequest::new(Profile::new()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn analysis_failure_aborts_attempt() {
        let mut mock = MockCompletionTransport::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Err(ProviderError::Quota { status: 429 }));

        let provider = RemoteModelProvider::new(
            RemoteEndpointConfig::openrouter(),
            defaults(),
            Arc::new(mock),
        );
        assert_eq!(
            provider
                .generate(&GenerationRequest::new(Profile::new()))
                .await
                .unwrap_err(),
            ProviderError::Quota { status: 429 }
        );
    }

    #[tokio::test]
    async fn unparseable_reply_is_no_code() {
        let mut mock = MockCompletionTransport::new();
        mock.expect_complete()
            .returning(|_| Ok("As an AI model I prefer prose.".into()));

        let provider = RemoteModelProvider::new(
            RemoteEndpointConfig::openrouter().single_stage(),
            defaults(),
            Arc::new(mock),
        );
        assert_eq!(
            provider
                .generate(&GenerationRequest::new(Profile::new()))
                .await
                .unwrap_err(),
            ProviderError::NoExtractableCode
        );
    }

    #[test]
    fn temperature_is_clamped() {
        let mut endpoint = RemoteEndpointConfig::openrouter();
        endpoint.temperature = 3.0;
        assert!((endpoint.effective_temperature() - 1.0).abs() < f32::EPSILON);
        endpoint.temperature = f32::NAN;
        assert!((endpoint.effective_temperature() - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
    }
}
