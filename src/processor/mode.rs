//! Processing mode selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ProcessorError;

/// How attested processing is performed, fixed at orchestrator construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Local simulation, no network.
    Mock,
    /// External attested backend only.
    Real,
    /// Real backend with a single mock fallback on transient failure.
    Auto,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Mock => "mock",
            ProcessingMode::Real => "real",
            ProcessingMode::Auto => "auto",
        }
    }

    /// Whether this mode needs endpoint credentials.
    pub fn requires_backend(&self) -> bool {
        !matches!(self, ProcessingMode::Mock)
    }

    /// Whether transient backend errors in this mode will be healed by the
    /// mock fallback.
    pub fn fallback_available(&self) -> bool {
        matches!(self, ProcessingMode::Auto)
    }
}

impl Default for ProcessingMode {
    fn default() -> Self {
        ProcessingMode::Mock
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = ProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(ProcessingMode::Mock),
            "real" => Ok(ProcessingMode::Real),
            "auto" => Ok(ProcessingMode::Auto),
            other => Err(ProcessorError::Configuration(format!(
                "unknown processing mode '{}': expected mock|real|auto",
                other
            ))),
        }
    }
}

/// The mode that actually produced an [`AttestedResult`](super::AttestedResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Mock,
    Real,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Mock => "mock",
            ExecutionMode::Real => "real",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
