//! In-memory study ledger.
//!
//! Mirrors the on-chain study registry contract: a study is keyed by its
//! content fingerprint, registered once, and carries the contributor and
//! the ledger's own timestamp.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineOutput;
use crate::prover::verify_structure;

use super::{LedgerError, LedgerLookup};

/// A registered study as stored by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRecord {
    pub fingerprint: String,
    pub contributor: String,
    /// Ledger clock, unix seconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Availability {
    #[default]
    Online,
    Offline,
    NotDeployed,
}

#[derive(Debug, Default)]
pub struct InMemoryStudyLedger {
    studies: RwLock<HashMap<String, StudyRecord>>,
    availability: Availability,
}

impl InMemoryStudyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger whose every operation fails with `Unavailable`.
    pub fn unavailable() -> Self {
        Self::with_availability(Availability::Offline)
    }

    /// A ledger whose contract was never deployed: every operation fails
    /// with `NotDeployed`.
    pub fn not_deployed() -> Self {
        Self::with_availability(Availability::NotDeployed)
    }

    fn with_availability(availability: Availability) -> Self {
        Self {
            studies: RwLock::default(),
            availability,
        }
    }

    fn ensure_available(&self) -> Result<(), LedgerError> {
        match self.availability {
            Availability::Online => Ok(()),
            Availability::Offline => Err(LedgerError::Unavailable("ledger offline".to_string())),
            Availability::NotDeployed => Err(LedgerError::NotDeployed),
        }
    }

    pub fn register_study(&self, output: &PipelineOutput) -> Result<StudyRecord, LedgerError> {
        self.ensure_available()?;

        let fingerprint = output.content_fingerprint();
        if output.attestation_token().is_empty() {
            return Err(LedgerError::InvalidAttestation);
        }

        let public_inputs = output.public_inputs();
        let bound = public_inputs[0] == fingerprint
            && public_inputs[1] == output.attestation_token();
        if output.proof().is_empty() || !bound || !verify_structure(output.proof(), public_inputs)
        {
            return Err(LedgerError::InvalidProof);
        }

        let mut studies = self.studies.write();
        if studies.contains_key(fingerprint) {
            return Err(LedgerError::DuplicateStudy {
                fingerprint: fingerprint.to_string(),
            });
        }

        let record = StudyRecord {
            fingerprint: fingerprint.to_string(),
            contributor: output.submitter_identity().to_string(),
            timestamp: Utc::now().timestamp(),
        };
        studies.insert(fingerprint.to_string(), record.clone());
        Ok(record)
    }

    pub fn get_study(&self, fingerprint: &str) -> Result<StudyRecord, LedgerError> {
        self.ensure_available()?;
        self.studies
            .read()
            .get(fingerprint)
            .cloned()
            .ok_or_else(|| LedgerError::StudyNotFound {
                fingerprint: fingerprint.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.studies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.studies.read().is_empty()
    }
}

#[async_trait]
impl LedgerLookup for InMemoryStudyLedger {
    async fn exists_on_chain(&self, fingerprint: &str) -> Result<bool, LedgerError> {
        self.ensure_available()?;
        Ok(self.studies.read().contains_key(fingerprint))
    }
}
