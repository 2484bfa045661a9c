//! Error classification for the hsched crate
//!
//! Each module owns its error enum ([`SchedulerError`], [`IndexError`],
//! [`BusError`], [`ConfigError`], [`ParseError`]). This module adds the
//! shared classification the ingress adapter uses to settle a failed message:
//!
//! - [`HschedErrorTrait`] - recoverability and category of an error
//! - [`ErrorCategory`] - coarse classification used in logs
//!
//! ```rust,ignore
//! use hsched::error::HschedErrorTrait;
//!
//! let outcome = if err.is_recoverable() { Outcome::Nack } else { Outcome::Reject };
//! ```

// Re-export domain-specific errors for convenience
pub use crate::bus::BusError;
pub use crate::config::ConfigError;
pub use crate::index::IndexError;
pub use crate::scheduler::SchedulerError;
pub use crate::utils::error::ParseError;

/// Common trait for hsched error types
pub trait HschedErrorTrait: std::error::Error {
    /// Whether the failed operation may succeed if attempted again
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transport-level failures (connection refused, timeout)
    Network,
    /// Malformed URLs, envelopes or responses
    Parsing,
    /// Configuration and validation errors
    Config,
    /// Message bus errors
    Bus,
    /// Resource index errors
    Index,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Config => "config",
            Self::Bus => "bus",
            Self::Index => "index",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HschedErrorTrait for SchedulerError {
    fn is_recoverable(&self) -> bool {
        SchedulerError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedEvent(_) | Self::Encode(_) => ErrorCategory::Parsing,
            Self::QueryFailed(e) => index_category(e),
            Self::PublishFailed(_) => ErrorCategory::Bus,
        }
    }
}

fn index_category(err: &IndexError) -> ErrorCategory {
    match err {
        IndexError::Network(_) => ErrorCategory::Network,
        IndexError::InvalidResponse(_) => ErrorCategory::Parsing,
        IndexError::Init(_) => ErrorCategory::Config,
        IndexError::Http { .. } => ErrorCategory::Index,
    }
}
