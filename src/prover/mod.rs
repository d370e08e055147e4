//! Proof generator client.
//!
//! A proof is a function of exactly two values, the content fingerprint
//! and the attestation token. The [`ProofGenerator`] signature admits
//! nothing else, so submitter identity, timestamps and summary fields
//! cannot reach a proof or its public inputs.

pub mod mock;
pub mod verify;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mock::MockProver;
pub use verify::{verify_structure, verify_with_key, PROOF_FORMAT_TAG};

/// Output of proof generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofResult {
    pub proof: String,
    /// Always `[content_fingerprint, attestation_token]`.
    pub public_inputs: [String; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_key: Option<String>,
}

impl ProofResult {
    pub fn fingerprint(&self) -> &str {
        &self.public_inputs[0]
    }

    pub fn attestation_token(&self) -> &str {
        &self.public_inputs[1]
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// Empty or malformed inputs. Indicates an upstream contract
    /// violation, not a user error.
    #[error("invalid proof input: {0}")]
    InvalidInput(String),

    #[error("proof backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ProofGenerator: Send + Sync {
    async fn generate(
        &self,
        fingerprint: &str,
        attestation_token: &str,
    ) -> Result<ProofResult, ProofError>;

    /// Structural check; backends with real verifiers override this.
    fn verify(&self, proof: &str, public_inputs: &[String]) -> bool {
        verify_structure(proof, public_inputs)
    }
}
