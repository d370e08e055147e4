//! Attested processing output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::mode::ExecutionMode;

/// Pre-redacted study metadata.
///
/// Only coarse, non-identifying fields exist here; anything a backend
/// returns outside this shape is dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySummary {
    /// Coarse demographic bucket, e.g. "40-49".
    pub age_bucket: String,
    pub condition_category: String,
    /// Biomarker name -> reference range, e.g. "hba1c" -> "5.7-6.4".
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub biomarker_ranges: BTreeMap<String, String>,
    /// Anonymized source facility tag, never a facility name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_tag: Option<String>,
}

/// Normalized result of attested processing, whichever backend ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedResult {
    /// Lowercase hex SHA-256 of the submitted bytes.
    pub content_fingerprint: String,
    pub summary: StudySummary,
    pub attestation_token: String,
    pub mode_used: ExecutionMode,
    pub used_fallback: bool,
}
