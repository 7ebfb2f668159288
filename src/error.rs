//! Error types for the AAP provider.

use thiserror::Error;

/// Errors returned by provider operations.
///
/// Errors abort the operation. Advisory information that should not stop a
/// plan travels as [`Diagnostic`](crate::diagnostics::Diagnostic) values
/// instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object does not exist on the AAP server.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource or data source state failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is not configured, or its configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The AAP server answered with a status code the operation does not accept.
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: u16,
        /// The response body, decoded lossily as UTF-8.
        body: String,
    },

    /// An internal provider error occurred.
    #[error("Provider error: {0}")]
    Sdk(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::InvalidUrl(_err) => "invalid URL (see Debug output)",
            Self::Http(_err) => "HTTP error (see Debug output)",
            Self::UnexpectedStatus { body, .. } => body,
            Self::Sdk(msg) => msg,
        }
    }

    /// Whether the error means the remote object is gone.
    ///
    /// Read operations use this to let the host drop the resource from state.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::UnexpectedStatus { status: 404, .. }
        )
    }
}
