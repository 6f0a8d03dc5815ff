//! Error types for the incident API bindings.

use thiserror::Error;

/// Errors produced by the incident API bindings.
///
/// Validation failures (`MissingFromEmail`, `InvalidArguments`) are raised
/// before any network activity; transport failures pass through unchanged
/// so callers can branch on the failure kind.
#[derive(Debug, Error)]
pub enum Error {
    /// Acting-user email is missing or blank
    #[error("missing or invalid from email: {0:?}")]
    MissingFromEmail(Option<String>),

    /// A structural argument is missing or malformed
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The operation is not available on this resource
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Required configuration is absent or unusable
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API returned a non-success status
    #[error("API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
