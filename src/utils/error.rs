//! Error types shared across the scheduler
//!
//! This module defines the parsing errors raised while validating inbound URLs.

use thiserror::Error;

/// Errors that can occur while validating or fingerprinting a URL
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not an absolute URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Scheme other than http/https
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Host is not a hidden service
    #[error("Not a hidden service host: {0}")]
    NotHiddenService(String),

    /// Fingerprint is not valid URL-safe base64
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}

impl ParseError {
    /// Short machine-friendly label, used for log fields and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::UnsupportedScheme(_) => "unsupported_scheme",
            Self::NotHiddenService(_) => "not_hidden_service",
            Self::InvalidFingerprint(_) => "invalid_fingerprint",
        }
    }
}
