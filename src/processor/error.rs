//! Attested processor errors.

use thiserror::Error;

/// Failures of the attested processor client.
///
/// The three transient kinds carry `fallback_available`, which is true
/// only when the client was built in `auto` mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("attested backend timed out after {timeout_ms}ms")]
    Timeout {
        timeout_ms: u64,
        fallback_available: bool,
    },

    #[error("attested backend quota exceeded: {detail}")]
    QuotaExceeded {
        detail: String,
        fallback_available: bool,
    },

    #[error("attested backend network error: {detail}")]
    Network {
        detail: String,
        fallback_available: bool,
    },
}

impl ProcessorError {
    /// True for the transient kinds (`Timeout`, `QuotaExceeded`, `Network`).
    pub fn is_transient(&self) -> bool {
        !matches!(self, ProcessorError::Configuration(_))
    }

    pub fn fallback_available(&self) -> bool {
        match self {
            ProcessorError::Configuration(_) => false,
            ProcessorError::Timeout {
                fallback_available, ..
            }
            | ProcessorError::QuotaExceeded {
                fallback_available, ..
            }
            | ProcessorError::Network {
                fallback_available, ..
            } => *fallback_available,
        }
    }

    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessorError::Configuration(_) => "configuration",
            ProcessorError::Timeout { .. } => "timeout",
            ProcessorError::QuotaExceeded { .. } => "quota_exceeded",
            ProcessorError::Network { .. } => "network",
        }
    }

    pub(crate) fn network(detail: impl Into<String>, fallback_available: bool) -> Self {
        ProcessorError::Network {
            detail: detail.into(),
            fallback_available,
        }
    }
}
