//! Sheetsmith generation providers
//!
//! Three strategies turn a [`GenerationRequest`](sheetsmith_model::GenerationRequest)
//! into candidate code:
//! - [`RemoteModelProvider`]: external model endpoint over an OpenAI-compatible API
//! - [`TemplateProvider`]: deterministic domain templates
//! - [`UniversalFallbackProvider`]: terminal provider, total over all profiles
//!
//! They are wrapped in the [`GenerationProvider`] enum and tried in priority
//! order by the orchestrator. Profile content only ever reaches generated
//! source as escaped string literals.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod fallback;
pub mod literal;
pub mod provider;
pub mod remote;
pub mod template;

pub use error::{FallbackError, ProviderError};
pub use fallback::{outline, SheetOutline, UniversalFallbackProvider};
pub use provider::{GenerationProvider, ProviderId, ProviderTier};
pub use remote::{
    CompletionRequest, CompletionTransport, HttpTransport, RemoteEndpointConfig,
    RemoteModelProvider,
};
pub use template::{DomainTemplate, TemplateProvider};
