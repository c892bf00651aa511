//! Orchestrator configuration
//!
//! Loaded once from TOML, optionally overridden from the environment, then
//! validated and frozen behind an `Arc` by the orchestrator.

use crate::error::ConfigError;
use crate::scorer::ScoringWeights;
use serde::{Deserialize, Serialize};
use sheetsmith_model::StageModels;
use sheetsmith_providers::{ProviderId, RemoteEndpointConfig};
use sheetsmith_validator::ValidatorConfig;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default model for both stages
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3-0324:free";
/// Default per-provider time budget
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

fn default_priority() -> Vec<String> {
    ["openrouter", "deepseek", ProviderId::TEMPLATE, ProviderId::UNIVERSAL_FALLBACK]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_models() -> StageModels {
    StageModels::new(DEFAULT_MODEL, DEFAULT_MODEL)
}

fn default_remote() -> Vec<RemoteEndpointConfig> {
    vec![RemoteEndpointConfig::openrouter(), RemoteEndpointConfig::deepseek()]
}

/// Per-provider time budgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for providers without an override
    pub default_ms: u64,
    /// Overrides keyed by provider id
    pub per_provider: BTreeMap<String, u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_TIMEOUT_MS,
            per_provider: BTreeMap::new(),
        }
    }
}

/// Immutable orchestration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Provider ids in the order they are tried
    pub priority: Vec<String>,
    /// Default stage models
    pub models: StageModels,
    /// Time budgets
    pub timeouts: TimeoutConfig,
    /// Remote endpoints, one provider each
    pub remote: Vec<RemoteEndpointConfig>,
    /// Output validator settings
    pub validator: ValidatorConfig,
    /// Confidence policy
    pub scoring: ScoringWeights,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            models: default_models(),
            timeouts: TimeoutConfig::default(),
            remote: default_remote(),
            validator: ValidatorConfig::default(),
            scoring: ScoringWeights::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// `Parse` on malformed TOML or unknown value types
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `Read` or `Parse`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With priority list
    #[must_use]
    pub fn with_priority<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = ids.into_iter().map(Into::into).collect();
        self
    }

    /// With remote endpoints
    #[must_use]
    pub fn with_remote(mut self, remote: Vec<RemoteEndpointConfig>) -> Self {
        self.remote = remote;
        self
    }

    /// With default time budget
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.default_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Recognized variables: `PROVIDER_PRIORITY` (comma-separated),
    /// `ANALYSIS_MODEL`, `GENERATION_MODEL`, `API_TIMEOUT` (seconds),
    /// `MAX_TOKENS`, `TEMPERATURE` and `DEEPSEEK_BASE_URL`. Blank values
    /// are ignored.
    ///
    /// # Errors
    /// `InvalidEnv` when a numeric variable does not parse
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(priority) = get("PROVIDER_PRIORITY") {
            self.priority = priority
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(model) = get("ANALYSIS_MODEL") {
            self.models.analysis = model;
        }
        if let Some(model) = get("GENERATION_MODEL") {
            self.models.generation = model;
        }
        if let Some(secs) = get("API_TIMEOUT") {
            let secs: u64 = parse_env("API_TIMEOUT", &secs)?;
            self.timeouts.default_ms = secs.saturating_mul(1000);
        }
        if let Some(tokens) = get("MAX_TOKENS") {
            let tokens: u32 = parse_env("MAX_TOKENS", &tokens)?;
            for endpoint in &mut self.remote {
                endpoint.max_tokens = tokens;
            }
        }
        if let Some(temperature) = get("TEMPERATURE") {
            let temperature: f32 = parse_env("TEMPERATURE", &temperature)?;
            for endpoint in &mut self.remote {
                endpoint.temperature = temperature;
            }
        }
        if let Some(base_url) = get("DEEPSEEK_BASE_URL") {
            for endpoint in self.remote.iter_mut().filter(|e| ProviderId::new(&e.id).as_str() == "deepseek") {
                endpoint.base_url.clone_from(&base_url);
            }
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    ///
    /// # Errors
    /// See [`Self::apply_env_overrides`]
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.apply_env_overrides(|var| std::env::var(var).ok())?;
        Ok(self)
    }

    /// Normalized priority ids
    #[must_use]
    pub fn priority_ids(&self) -> Vec<ProviderId> {
        self.priority.iter().map(ProviderId::new).collect()
    }

    /// Time budget for a provider
    #[must_use]
    pub fn timeout_for(&self, id: &ProviderId) -> Duration {
        let ms = self
            .timeouts
            .per_provider
            .iter()
            .find(|(key, _)| ProviderId::new(key) == *id)
            .map_or(self.timeouts.default_ms, |(_, ms)| *ms);
        Duration::from_millis(ms)
    }

    /// Check structural constraints
    ///
    /// Provider ids are only checked for shape here; resolving them against
    /// registered providers happens at orchestrator construction.
    ///
    /// # Errors
    /// The first [`ConfigError`] found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ids = self.priority_ids();
        let mut seen = HashSet::new();
        for (index, id) in ids.iter().enumerate() {
            if id.as_str().is_empty() {
                return Err(ConfigError::UnknownProvider(String::new()));
            }
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateProvider(id.to_string()));
            }
            if id.is_terminal() && index + 1 != ids.len() {
                return Err(ConfigError::TerminalNotLast);
            }
        }

        if self.timeouts.default_ms == 0 {
            return Err(ConfigError::InvalidTimeout("default".to_string()));
        }
        if let Some((id, _)) = self.timeouts.per_provider.iter().find(|(_, ms)| **ms == 0) {
            return Err(ConfigError::InvalidTimeout(id.clone()));
        }

        let mut endpoint_ids = HashSet::new();
        for endpoint in &self.remote {
            validate_endpoint(endpoint)?;
            let id = ProviderId::new(&endpoint.id);
            if !endpoint_ids.insert(id.clone()) {
                return Err(ConfigError::DuplicateProvider(id.to_string()));
            }
        }

        self.scoring.validate()?;
        self.validator.validate()?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn validate_endpoint(endpoint: &RemoteEndpointConfig) -> Result<(), ConfigError> {
    let id = ProviderId::new(&endpoint.id);
    if id.as_str().is_empty() {
        return Err(ConfigError::InvalidEndpoint {
            id: endpoint.id.clone(),
            reason: "id must not be blank".to_string(),
        });
    }
    if id.is_terminal() || id == ProviderId::template() {
        return Err(ConfigError::ReservedProviderId(id.to_string()));
    }
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        id: id.to_string(),
        reason,
    };
    let url = Url::parse(&endpoint.base_url).map_err(|e| invalid(format!("base_url: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if endpoint.api_key_env.trim().is_empty() && endpoint.api_key.is_none() {
        return Err(invalid("api_key_env must not be blank".to_string()));
    }
    if endpoint.max_tokens == 0 {
        return Err(invalid("max_tokens must be greater than zero".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_follow_the_standard_chain() {
        let config = OrchestratorConfig::default();
        assert_eq!(
            config.priority,
            vec!["openrouter", "deepseek", "template", "universal_fallback"]
        );
        assert_eq!(config.timeout_for(&ProviderId::new("deepseek")), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_sections_are_optional() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
priority = ["template", "universal_fallback"]

[timeouts.per_provider]
template = 5000
"#,
        )
        .unwrap();

        assert_eq!(config.priority.len(), 2);
        assert_eq!(config.models.analysis, DEFAULT_MODEL);
        assert_eq!(config.remote.len(), 2);
        assert_eq!(config.timeout_for(&ProviderId::template()), Duration::from_millis(5000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = OrchestratorConfig::default();
        config
            .apply_env_overrides(env(&[
                ("PROVIDER_PRIORITY", "deepseek, template_engine ,universal_fallback"),
                ("GENERATION_MODEL", "deepseek-coder"),
                ("API_TIMEOUT", "30"),
                ("MAX_TOKENS", "2048"),
                ("TEMPERATURE", "0.7"),
                ("DEEPSEEK_BASE_URL", "http://localhost:9000/v1"),
                ("ANALYSIS_MODEL", "   "),
            ]))
            .unwrap();

        assert_eq!(
            config.priority_ids(),
            vec![
                ProviderId::new("deepseek"),
                ProviderId::template(),
                ProviderId::universal_fallback()
            ]
        );
        assert_eq!(config.models.analysis, DEFAULT_MODEL);
        assert_eq!(config.models.generation, "deepseek-coder");
        assert_eq!(config.timeouts.default_ms, 30_000);
        assert!(config.remote.iter().all(|e| e.max_tokens == 2048));
        assert_eq!(config.remote[1].base_url, "http://localhost:9000/v1");
        assert_eq!(config.remote[0].base_url, sheetsmith_providers::remote::OPENROUTER_BASE_URL);
    }

    #[test]
    fn bad_numeric_env_is_reported() {
        let mut config = OrchestratorConfig::default();
        let err = config
            .apply_env_overrides(env(&[("API_TIMEOUT", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "API_TIMEOUT"));
    }

    #[test]
    fn structural_errors() {
        let dup = OrchestratorConfig::default().with_priority(["template", "Template"]);
        assert!(matches!(dup.validate(), Err(ConfigError::DuplicateProvider(_))));

        let terminal = OrchestratorConfig::default().with_priority(["universal_fallback", "template"]);
        assert!(matches!(terminal.validate(), Err(ConfigError::TerminalNotLast)));

        let mut zero = OrchestratorConfig::default();
        zero.timeouts.per_provider.insert("deepseek".to_string(), 0);
        assert!(matches!(zero.validate(), Err(ConfigError::InvalidTimeout(ref id)) if id == "deepseek"));

        let reserved = OrchestratorConfig::default().with_remote(vec![RemoteEndpointConfig::new(
            "template",
            "https://example.com/v1",
            "KEY",
        )]);
        assert!(matches!(reserved.validate(), Err(ConfigError::ReservedProviderId(_))));

        let bad_url = OrchestratorConfig::default().with_remote(vec![RemoteEndpointConfig::new(
            "local",
            "not a url",
            "KEY",
        )]);
        assert!(matches!(bad_url.validate(), Err(ConfigError::InvalidEndpoint { .. })));
    }

    #[test]
    fn empty_priority_is_valid() {
        let config = OrchestratorConfig::default().with_priority(Vec::<String>::new());
        assert!(config.validate().is_ok());
    }
}
