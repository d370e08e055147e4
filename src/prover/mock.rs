//! Deterministic mock prover.
//!
//! Stands in for a zero-knowledge backend: the "proof" is an Ed25519
//! signature over the domain-separated digest of the two public inputs.
//! Verifiers holding the verification key can check it; the structural
//! verifier only checks its shape.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use crate::processor::fingerprint::is_fingerprint;

use super::verify::{proof_message, PROOF_FORMAT_TAG};
use super::{ProofError, ProofGenerator, ProofResult};

const DEFAULT_SEED_LABEL: &[u8] = b"study-pipeline mock prover seed v1";

pub struct MockProver {
    signing_key: SigningKey,
}

impl Default for MockProver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProver {
    /// Prover with the well-known development seed.
    pub fn new() -> Self {
        let seed: [u8; 32] = Sha256::digest(DEFAULT_SEED_LABEL).into();
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Hex-encoded Ed25519 public key.
    pub fn verification_key(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Synchronous core of [`ProofGenerator::generate`].
    pub fn prove(&self, fingerprint: &str, attestation_token: &str) -> Result<ProofResult, ProofError> {
        if fingerprint.is_empty() {
            return Err(ProofError::InvalidInput("fingerprint is empty".to_string()));
        }
        if attestation_token.is_empty() {
            return Err(ProofError::InvalidInput(
                "attestation token is empty".to_string(),
            ));
        }
        if !is_fingerprint(fingerprint) {
            return Err(ProofError::InvalidInput(format!(
                "fingerprint is not a hex digest (len={})",
                fingerprint.len()
            )));
        }

        let message = proof_message(fingerprint, attestation_token);
        let signature = self.signing_key.sign(&message);

        Ok(ProofResult {
            proof: format!(
                "{}{}",
                PROOF_FORMAT_TAG,
                general_purpose::URL_SAFE_NO_PAD.encode(signature.to_bytes())
            ),
            public_inputs: [fingerprint.to_string(), attestation_token.to_string()],
            verification_key: Some(self.verification_key()),
        })
    }
}

#[async_trait]
impl ProofGenerator for MockProver {
    async fn generate(
        &self,
        fingerprint: &str,
        attestation_token: &str,
    ) -> Result<ProofResult, ProofError> {
        self.prove(fingerprint, attestation_token)
    }
}
