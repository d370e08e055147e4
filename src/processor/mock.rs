//! Simulated attested backend.
//!
//! No network, no parsing of the document. The fingerprint is the SHA-256
//! of the bytes; the attestation token and summary are derived from the
//! fingerprint alone, so identical content always yields an identical
//! result.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::logging::structured::LogContext;

use super::error::ProcessorError;
use super::fingerprint::fingerprint;
use super::mode::{ExecutionMode, ProcessingMode};
use super::types::{AttestedResult, StudySummary};
use super::AttestedProcessor;

/// Prefix of every simulated attestation token.
pub const MOCK_ATTESTATION_PREFIX: &str = "mock-attestation-v1:";

const AGE_BUCKETS: &[&str] = &["18-29", "30-39", "40-49", "50-59", "60-69", "70+"];

const CONDITION_CATEGORIES: &[&str] = &[
    "cardiology",
    "endocrinology",
    "oncology",
    "neurology",
    "pulmonology",
    "nephrology",
];

const BIOMARKER_RANGES: &[(&str, &str)] = &[
    ("hba1c_pct", "5.7-6.4"),
    ("ldl_mg_dl", "100-129"),
    ("systolic_mmhg", "120-139"),
    ("egfr_ml_min", "60-89"),
];

/// Local stand-in for the attested backend.
#[derive(Debug, Clone, Default)]
pub struct MockProcessor;

impl MockProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`AttestedProcessor::process`] for mock mode.
    pub fn process_sync(&self, document: &[u8], ctx: &LogContext) -> AttestedResult {
        let content_fingerprint = fingerprint(document);

        log::debug!(
            "{} MOCK_PROCESS bytes={} fingerprint={}",
            ctx,
            document.len(),
            content_fingerprint
        );

        AttestedResult {
            summary: synthesize_summary(&content_fingerprint),
            attestation_token: mock_attestation_token(&content_fingerprint),
            content_fingerprint,
            mode_used: ExecutionMode::Mock,
            used_fallback: false,
        }
    }
}

#[async_trait]
impl AttestedProcessor for MockProcessor {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::Mock
    }

    async fn process(
        &self,
        document: &[u8],
        ctx: &LogContext,
    ) -> Result<AttestedResult, ProcessorError> {
        Ok(self.process_sync(document, ctx))
    }
}

fn domain_digest(domain: &str, fingerprint: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(fingerprint.as_bytes());
    hasher.finalize().into()
}

/// Deterministic simulated attestation token for a fingerprint.
pub fn mock_attestation_token(fingerprint: &str) -> String {
    format!(
        "{}{}",
        MOCK_ATTESTATION_PREFIX,
        hex::encode(domain_digest("mock-attestation-v1", fingerprint))
    )
}

/// Deterministic synthetic summary for a fingerprint.
///
/// Every field is picked from a fixed vocabulary, so nothing here can
/// carry identifying information.
pub fn synthesize_summary(fingerprint: &str) -> StudySummary {
    let seed = domain_digest("mock-summary-v1", fingerprint);

    let age_bucket = AGE_BUCKETS[seed[0] as usize % AGE_BUCKETS.len()].to_string();
    let condition_category =
        CONDITION_CATEGORIES[seed[1] as usize % CONDITION_CATEGORIES.len()].to_string();

    let biomarker_ranges: BTreeMap<String, String> = BIOMARKER_RANGES
        .iter()
        .enumerate()
        .filter(|(i, _)| seed[2 + i] & 1 == 1)
        .map(|(_, (name, range))| (name.to_string(), range.to_string()))
        .collect();

    let facility_tag = if seed[8] & 1 == 1 {
        Some(format!("facility-{}", hex::encode(&seed[9..13])))
    } else {
        None
    };

    StudySummary {
        age_bucket,
        condition_category,
        biomarker_ranges,
        facility_tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::fingerprint::is_fingerprint;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let ctx = LogContext::new("run-mock");
        let processor = MockProcessor::new();

        let first = processor.process(b"cohort export v1", &ctx).await.unwrap();
        let second = processor.process(b"cohort export v1", &ctx).await.unwrap();

        assert_eq!(first, second);
        assert!(is_fingerprint(&first.content_fingerprint));
        assert_eq!(first.mode_used, ExecutionMode::Mock);
        assert!(!first.used_fallback);
        assert!(first.attestation_token.starts_with(MOCK_ATTESTATION_PREFIX));
    }

    #[tokio::test]
    async fn test_distinct_content_distinct_fingerprint() {
        let ctx = LogContext::new("run-mock");
        let processor = MockProcessor::new();

        let a = processor.process(b"study a", &ctx).await.unwrap();
        let b = processor.process(b"study b", &ctx).await.unwrap();
        assert_ne!(a.content_fingerprint, b.content_fingerprint);
        assert_ne!(a.attestation_token, b.attestation_token);
    }

    #[test]
    fn test_summary_uses_fixed_vocabulary() {
        let summary = synthesize_summary(&fingerprint(b"anything"));
        assert!(AGE_BUCKETS.contains(&summary.age_bucket.as_str()));
        assert!(CONDITION_CATEGORIES.contains(&summary.condition_category.as_str()));
        for (name, range) in &summary.biomarker_ranges {
            assert!(BIOMARKER_RANGES.contains(&(name.as_str(), range.as_str())));
        }
        if let Some(tag) = &summary.facility_tag {
            assert!(tag.starts_with("facility-"));
            assert_eq!(tag.len(), "facility-".len() + 8);
        }
    }

    #[test]
    fn test_summary_ignores_plaintext() {
        // Same bytes, same summary; the document text itself plays no role
        // beyond its hash.
        let ctx = LogContext::new("run-mock");
        let processor = MockProcessor::new();
        let result = processor.process_sync(b"Name: Jane Doe, DOB 1970-01-01", &ctx);
        let json = serde_json::to_string(&result.summary).unwrap();
        assert!(!json.contains("Jane"));
        assert!(!json.contains("1970"));
    }
}
