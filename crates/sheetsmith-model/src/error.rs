//! Error types for the model crate

/// Profile loading errors
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Input is not a decodable profile document
    #[error("profile decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
