//! Error types for the detection pipeline
//!
//! Only [`DetectError`] ever reaches a caller. Provider and index failures are
//! absorbed inside the pipeline and degrade to the rule-based path.

use crate::models::router::ProviderKind;
use thiserror::Error;

/// Structurally invalid input, reported back to the caller
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectError {
    #[error("unknown sector `{0}` (expected banking, medical, ecommerce or supply_chain)")]
    InvalidSector(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("malformed request body: {0}")]
    MalformedRequest(String),
}

impl DetectError {
    /// Short machine-readable kind used in error replies
    pub fn kind(&self) -> &'static str {
        match self {
            DetectError::InvalidSector(_) => "invalid_sector",
            DetectError::MissingField(_) => "missing_field",
            DetectError::InvalidPayload(_) => "invalid_payload",
            DetectError::MalformedRequest(_) => "malformed_request",
        }
    }
}

/// Failure of a single model backend call; always recovered by advancing the chain
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("rate limited")]
    RateLimited,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider {0} is not configured")]
    Unconfigured(ProviderKind),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout { after_ms: 0 }
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Failure of the similarity lookup; always recovered as an empty retrieval
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("vector index unavailable: {0}")]
    Unavailable(String),

    #[error("vector index query timed out")]
    Timeout,

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("malformed index response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for IndexError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IndexError::Timeout
        } else if e.is_decode() {
            IndexError::Malformed(e.to_string())
        } else {
            IndexError::Unavailable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DetectError::InvalidSector("crypto".to_string());
        assert!(err.to_string().contains("`crypto`"));
        assert_eq!(err.kind(), "invalid_sector");

        let err = ProviderError::Http {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: overloaded");

        let err = ProviderError::Unconfigured(ProviderKind::OpenRouter);
        assert_eq!(err.to_string(), "provider openrouter is not configured");
    }
}
