//! Transport error types.

use thiserror::Error;

/// Why an outbound fetch did not produce a usable response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The transport could not complete the request.
    #[error("Request to {url} failed: {reason}")]
    Unreachable { url: String, reason: String },

    /// The URL could not be used.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The upstream answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Failed to decode response body: {0}")]
    Decode(String),

    /// The request body could not be encoded.
    #[error("Failed to encode request body: {0}")]
    Encode(String),
}

impl FetchError {
    /// A transport failure for `url`.
    pub fn unreachable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// The upstream status, for [`FetchError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
