//! Provider registry
//!
//! Maps priority-list ids to constructed providers. The terminal fallback is
//! owned by the orchestrator and can never be registered.

use crate::config::OrchestratorConfig;
use crate::error::ConfigError;
use sheetsmith_providers::{
    GenerationProvider, HttpTransport, ProviderId, ProviderTier, RemoteModelProvider,
    TemplateProvider,
};
use std::sync::Arc;
use tracing::debug;

/// Registered providers, in registration order
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: Vec<(ProviderId, Arc<GenerationProvider>)>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Registry holding the built-in template provider
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: vec![(
                ProviderId::template(),
                Arc::new(GenerationProvider::from(TemplateProvider::new())),
            )],
        }
    }

    /// Built-ins plus one HTTP-backed provider per configured endpoint
    ///
    /// Inline keys win; otherwise `lookup` reads the endpoint's key variable.
    /// A missing key is not an error here: the provider fails its attempt
    /// with `missing-credential` instead.
    ///
    /// # Errors
    /// `InvalidEndpoint` for an unusable base URL, `DuplicateProvider` or
    /// `ReservedProviderId` for clashing ids
    pub fn from_config<F>(config: &OrchestratorConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registry = Self::new();
        for endpoint in &config.remote {
            let key = endpoint
                .api_key
                .clone()
                .or_else(|| lookup(&endpoint.api_key_env));
            let transport = HttpTransport::new(&endpoint.base_url, key, endpoint.api_key_env.clone())
                .map_err(|e| ConfigError::InvalidEndpoint {
                    id: endpoint.id.clone(),
                    reason: e.to_string(),
                })?;
            let provider = RemoteModelProvider::new(endpoint.clone(), config.models.clone(), Arc::new(transport))
                .with_entry_point(config.validator.entry_point.function.clone());
            registry.register(provider)?;
        }
        Ok(registry)
    }

    /// Register a provider under its own id
    ///
    /// # Errors
    /// `ReservedProviderId` for the terminal fallback, `DuplicateProvider`
    /// when the id is taken
    pub fn register(&mut self, provider: impl Into<GenerationProvider>) -> Result<(), ConfigError> {
        let provider = provider.into();
        let id = provider.id();
        if provider.tier() == ProviderTier::TerminalFallback || id.is_terminal() {
            return Err(ConfigError::ReservedProviderId(id.to_string()));
        }
        if self.get(&id).is_some() {
            return Err(ConfigError::DuplicateProvider(id.to_string()));
        }
        debug!(provider = %id, tier = %provider.tier(), "registered provider");
        self.providers.push((id, Arc::new(provider)));
        Ok(())
    }

    /// Look up a provider
    #[must_use]
    pub fn get(&self, id: &ProviderId) -> Option<&Arc<GenerationProvider>> {
        self.providers.iter().find(|(key, _)| key == id).map(|(_, p)| p)
    }

    /// Registered ids in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsmith_providers::UniversalFallbackProvider;

    #[test]
    fn from_config_registers_each_endpoint() {
        let registry = ProviderRegistry::from_config(&OrchestratorConfig::default(), |_| None).unwrap();
        assert_eq!(
            registry.ids(),
            vec![
                ProviderId::template(),
                ProviderId::new("openrouter"),
                ProviderId::new("deepseek")
            ]
        );
        assert_eq!(
            registry.get(&ProviderId::new("deepseek")).map(|p| p.tier()),
            Some(ProviderTier::Remote)
        );
    }

    #[test]
    fn terminal_and_duplicates_are_rejected() {
        let mut registry = ProviderRegistry::new();
        assert!(matches!(
            registry.register(UniversalFallbackProvider::new()),
            Err(ConfigError::ReservedProviderId(_))
        ));
        assert!(matches!(
            registry.register(TemplateProvider::new()),
            Err(ConfigError::DuplicateProvider(_))
        ));
    }
}
