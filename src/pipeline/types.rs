//! Pipeline input and output records.

use std::fmt;

use serde::Serialize;

use crate::processor::{ExecutionMode, StudySummary};

/// One submission. The buffer stays owned by the caller and is zeroed
/// before [`StudyPipeline::run`](super::StudyPipeline::run) returns.
pub struct PipelineInput<'a> {
    pub(crate) raw_buffer: &'a mut [u8],
    pub(crate) submitter_identity: String,
    pub(crate) display_name: Option<String>,
}

impl<'a> PipelineInput<'a> {
    pub fn new(raw_buffer: &'a mut [u8], submitter_identity: impl Into<String>) -> Self {
        Self {
            raw_buffer,
            submitter_identity: submitter_identity.into(),
            display_name: None,
        }
    }

    /// Non-PII label used only in log lines.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

impl fmt::Debug for PipelineInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineInput")
            .field("raw_buffer_len", &self.raw_buffer.len())
            .field("submitter_identity", &"<redacted>")
            .field("display_name", &self.display_name)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Processed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Processed => "processed",
        }
    }
}

/// Packaged record, ready for ledger submission. Built once, read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutput {
    status: RecordStatus,
    run_id: String,
    content_fingerprint: String,
    summary: StudySummary,
    attestation_token: String,
    proof: String,
    public_inputs: [String; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    verification_key: Option<String>,
    submitter_identity: String,
    unix_timestamp: i64,
    mode_used: ExecutionMode,
    used_fallback: bool,
}

/// Field set for [`PipelineOutput::from_parts`].
pub(crate) struct PipelineOutputParts {
    pub run_id: String,
    pub content_fingerprint: String,
    pub summary: StudySummary,
    pub attestation_token: String,
    pub proof: String,
    pub public_inputs: [String; 2],
    pub verification_key: Option<String>,
    pub submitter_identity: String,
    pub unix_timestamp: i64,
    pub mode_used: ExecutionMode,
    pub used_fallback: bool,
}

impl PipelineOutput {
    pub(crate) fn from_parts(parts: PipelineOutputParts) -> Self {
        Self {
            status: RecordStatus::Processed,
            run_id: parts.run_id,
            content_fingerprint: parts.content_fingerprint,
            summary: parts.summary,
            attestation_token: parts.attestation_token,
            proof: parts.proof,
            public_inputs: parts.public_inputs,
            verification_key: parts.verification_key,
            submitter_identity: parts.submitter_identity,
            unix_timestamp: parts.unix_timestamp,
            mode_used: parts.mode_used,
            used_fallback: parts.used_fallback,
        }
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn content_fingerprint(&self) -> &str {
        &self.content_fingerprint
    }

    pub fn summary(&self) -> &StudySummary {
        &self.summary
    }

    pub fn attestation_token(&self) -> &str {
        &self.attestation_token
    }

    pub fn proof(&self) -> &str {
        &self.proof
    }

    pub fn public_inputs(&self) -> &[String; 2] {
        &self.public_inputs
    }

    pub fn verification_key(&self) -> Option<&str> {
        self.verification_key.as_deref()
    }

    pub fn submitter_identity(&self) -> &str {
        &self.submitter_identity
    }

    /// Unix seconds, assigned at packaging.
    pub fn unix_timestamp(&self) -> i64 {
        self.unix_timestamp
    }

    pub fn mode_used(&self) -> ExecutionMode {
        self.mode_used
    }

    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }
}
