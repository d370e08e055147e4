//! Pipeline error type.
//!
//! Component errors are wrapped with `#[from]` so stages compose with `?`.
//! Every variant keeps its specific kind so callers can branch on it.

use thiserror::Error;

use crate::processor::ProcessorError;
use crate::prover::ProofError;
use crate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("duplicate content: {fingerprint}")]
    DuplicateFound { fingerprint: String },

    /// Another run holds the same content and has not finished. Retry
    /// once it settles; this is not a duplicate verdict.
    #[error("identical content is already being processed: {fingerprint}")]
    InFlight { fingerprint: String },

    #[error("proof generation failed: {0}")]
    Proof(#[from] ProofError),

    #[error("hash registry failure: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("stage {stage} timed out")]
    StageTimeout { stage: &'static str },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse class for mapping a failure at a transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Transient,
    Conflict,
    Rejected,
    Defect,
    Internal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Configuration => "configuration",
            ErrorClass::Transient => "transient",
            ErrorClass::Conflict => "conflict",
            ErrorClass::Rejected => "rejected",
            ErrorClass::Defect => "defect",
            ErrorClass::Internal => "internal",
        }
    }
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Processor(ProcessorError::Configuration(_)) => ErrorClass::Configuration,
            PipelineError::Processor(_)
            | PipelineError::StageTimeout { .. }
            | PipelineError::InFlight { .. } => ErrorClass::Transient,
            PipelineError::DuplicateFound { .. } => ErrorClass::Conflict,
            PipelineError::InvalidRequest(_) => ErrorClass::Rejected,
            PipelineError::Proof(ProofError::InvalidInput(_)) => ErrorClass::Defect,
            PipelineError::Proof(_) | PipelineError::Registry(_) | PipelineError::Internal(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Fingerprint carried by a `DuplicateFound`.
    pub fn duplicate_fingerprint(&self) -> Option<&str> {
        match self {
            PipelineError::DuplicateFound { fingerprint } => Some(fingerprint),
            _ => None,
        }
    }

    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Processor(e) => e.kind(),
            PipelineError::DuplicateFound { .. } => "duplicate_found",
            PipelineError::InFlight { .. } => "in_flight",
            PipelineError::Proof(_) => "proof",
            PipelineError::Registry(_) => "registry",
            PipelineError::InvalidRequest(_) => "invalid_request",
            PipelineError::StageTimeout { .. } => "stage_timeout",
            PipelineError::Internal(_) => "internal",
        }
    }
}
