//! Proof verification.
//!
//! [`verify_structure`] is what the pipeline and the ledger rely on. It
//! checks the two-input contract and the format tag only.
//! [`verify_with_key`] additionally checks the mock prover's Ed25519
//! signature against a verification key.

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::processor::fingerprint::is_fingerprint;

/// Format tag every proof string starts with.
pub const PROOF_FORMAT_TAG: &str = "zkmock-v1:";

const PROOF_DOMAIN: &[u8] = b"study-proof-v1";

/// Digest signed by the mock prover.
pub(crate) fn proof_message(fingerprint: &str, attestation_token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PROOF_DOMAIN);
    hasher.update(fingerprint.as_bytes());
    hasher.update([0u8]);
    hasher.update(attestation_token.as_bytes());
    hasher.finalize().into()
}

/// Structural validity: exactly two public inputs, a digest-shaped first
/// input, a non-empty second input, and a tagged, non-empty proof body.
pub fn verify_structure(proof: &str, public_inputs: &[String]) -> bool {
    let [fingerprint, attestation_token] = public_inputs else {
        return false;
    };

    if !is_fingerprint(fingerprint) || attestation_token.is_empty() {
        return false;
    }

    matches!(proof.strip_prefix(PROOF_FORMAT_TAG), Some(body) if !body.is_empty())
}

/// Structural check plus Ed25519 verification against a hex-encoded key.
pub fn verify_with_key(proof: &str, public_inputs: &[String], verification_key: &str) -> bool {
    if !verify_structure(proof, public_inputs) {
        return false;
    }

    let Some(key) = decode_verifying_key(verification_key) else {
        return false;
    };

    let Some(signature) = proof
        .strip_prefix(PROOF_FORMAT_TAG)
        .and_then(|body| general_purpose::URL_SAFE_NO_PAD.decode(body).ok())
        .and_then(|bytes| Signature::from_slice(&bytes).ok())
    else {
        return false;
    };

    let message = proof_message(&public_inputs[0], &public_inputs[1]);
    key.verify(&message, &signature).is_ok()
}

fn decode_verifying_key(hex_key: &str) -> Option<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(hex_key).ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::fingerprint::fingerprint;

    fn inputs() -> Vec<String> {
        vec![fingerprint(b"doc"), "attestation".to_string()]
    }

    #[test]
    fn test_structure_accepts_well_formed() {
        assert!(verify_structure("zkmock-v1:abc", &inputs()));
    }

    #[test]
    fn test_structure_rejects_wrong_arity() {
        let mut three = inputs();
        three.push("submitter".to_string());
        assert!(!verify_structure("zkmock-v1:abc", &three));
        assert!(!verify_structure("zkmock-v1:abc", &inputs()[..1]));
        assert!(!verify_structure("zkmock-v1:abc", &[]));
    }

    #[test]
    fn test_structure_rejects_bad_inputs() {
        assert!(!verify_structure(
            "zkmock-v1:abc",
            &["short".to_string(), "attestation".to_string()]
        ));
        assert!(!verify_structure(
            "zkmock-v1:abc",
            &[fingerprint(b"doc"), String::new()]
        ));
    }

    #[test]
    fn test_structure_rejects_bad_tag() {
        assert!(!verify_structure("groth16:abc", &inputs()));
        assert!(!verify_structure("zkmock-v1:", &inputs()));
        assert!(!verify_structure("", &inputs()));
    }

    #[test]
    fn test_message_binds_both_inputs() {
        let fp = fingerprint(b"doc");
        assert_ne!(proof_message(&fp, "a"), proof_message(&fp, "b"));
        // The separator keeps ("ab", "c") and ("a", "bc") apart.
        assert_ne!(proof_message("ab", "c"), proof_message("a", "bc"));
    }
}
