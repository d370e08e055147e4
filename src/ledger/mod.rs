//! Ledger lookups and the in-memory study ledger.
//!
//! The pipeline only consumes [`LedgerLookup::exists_on_chain`], and
//! treats it as a best-effort signal. Submission of the packaged record
//! happens outside the pipeline, through [`InMemoryStudyLedger::register_study`]
//! or a real chain client.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::{InMemoryStudyLedger, StudyRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger contract not deployed")]
    NotDeployed,

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("study already registered: {fingerprint}")]
    DuplicateStudy { fingerprint: String },

    #[error("invalid attestation")]
    InvalidAttestation,

    #[error("invalid proof")]
    InvalidProof,

    #[error("study not found: {fingerprint}")]
    StudyNotFound { fingerprint: String },
}

#[async_trait]
pub trait LedgerLookup: Send + Sync {
    async fn exists_on_chain(&self, fingerprint: &str) -> Result<bool, LedgerError>;
}
