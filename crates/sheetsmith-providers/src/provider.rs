//! Provider identity, tiers and the provider enum

use crate::error::ProviderError;
use crate::fallback::UniversalFallbackProvider;
use crate::remote::RemoteModelProvider;
use crate::template::TemplateProvider;
use serde::{Deserialize, Serialize};
use sheetsmith_model::{GeneratedCode, GenerationRequest};
use std::fmt;

/// Provider identifier as it appears in the priority list
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Built-in template provider
    pub const TEMPLATE: &'static str = "template";
    /// Built-in terminal provider
    pub const UNIVERSAL_FALLBACK: &'static str = "universal_fallback";

    /// Create identifier; trims, lowercases and maps legacy aliases
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        let id = id.as_ref().trim().to_ascii_lowercase();
        match id.as_str() {
            "template_engine" | "templates" => Self(Self::TEMPLATE.to_string()),
            "fallback" | "universal" => Self(Self::UNIVERSAL_FALLBACK.to_string()),
            _ => Self(id),
        }
    }

    /// Template provider id
    #[must_use]
    pub fn template() -> Self {
        Self(Self::TEMPLATE.to_string())
    }

    /// Terminal provider id
    #[must_use]
    pub fn universal_fallback() -> Self {
        Self(Self::UNIVERSAL_FALLBACK.to_string())
    }

    /// String form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this names the terminal provider
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.0 == Self::UNIVERSAL_FALLBACK
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Provider tier; ordering is `TerminalFallback < Template < Remote`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderTier {
    /// Universal fallback
    TerminalFallback,
    /// Deterministic domain templates
    Template,
    /// External model endpoint
    Remote,
}

impl ProviderTier {
    /// All tiers, lowest first
    pub const ALL: [ProviderTier; 3] = [Self::TerminalFallback, Self::Template, Self::Remote];

    /// Stable identifier
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TerminalFallback => "terminal-fallback",
            Self::Template => "template",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generation strategy
#[derive(Debug)]
pub enum GenerationProvider {
    /// External model endpoint
    Remote(RemoteModelProvider),
    /// Domain template library
    Template(TemplateProvider),
    /// Terminal fallback
    Fallback(UniversalFallbackProvider),
}

impl GenerationProvider {
    /// Provider identifier
    #[must_use]
    pub fn id(&self) -> ProviderId {
        match self {
            Self::Remote(p) => p.id().clone(),
            Self::Template(_) => ProviderId::template(),
            Self::Fallback(_) => ProviderId::universal_fallback(),
        }
    }

    /// Provider tier
    #[must_use]
    pub fn tier(&self) -> ProviderTier {
        match self {
            Self::Remote(_) => ProviderTier::Remote,
            Self::Template(_) => ProviderTier::Template,
            Self::Fallback(_) => ProviderTier::TerminalFallback,
        }
    }

    /// Produce candidate code for a request
    ///
    /// # Errors
    /// Returns a [`ProviderError`] when the provider produced no candidate
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedCode, ProviderError> {
        match self {
            Self::Remote(p) => p.generate(request).await,
            Self::Template(p) => Ok(p.generate(&request.profile)),
            Self::Fallback(p) => Ok(p.generate(&request.profile)?),
        }
    }
}

impl From<RemoteModelProvider> for GenerationProvider {
    fn from(p: RemoteModelProvider) -> Self {
        Self::Remote(p)
    }
}

impl From<TemplateProvider> for GenerationProvider {
    fn from(p: TemplateProvider) -> Self {
        Self::Template(p)
    }
}

impl From<UniversalFallbackProvider> for GenerationProvider {
    fn from(p: UniversalFallbackProvider) -> Self {
        Self::Fallback(p)
    }
}
