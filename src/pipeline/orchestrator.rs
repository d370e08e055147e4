//! Pipeline orchestrator.
//!
//! Runs one submission through the stages in strict order:
//! 1. Request validation
//! 2. Attested processing on a wiped-after-use copy of the buffer
//! 3. Registry reservation and duplicate check (registry, then ledger)
//! 4. Proof generation
//! 5. Reservation commit (only after a proof exists)
//! 6. Buffer wipe, timestamp and packaging
//!
//! The caller's buffer is owned by a [`BufferGuard`] for the whole run,
//! so it is zeroed on success, on every typed failure, on panic, and
//! when the run future is dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;

use crate::config::PipelineConfig;
use crate::dedup::guard::duplicate;
use crate::dedup::{DuplicateGuard, DuplicateSource};
use crate::error::PipelineError;
use crate::ledger::LedgerLookup;
use crate::processor::{
    build_processor_with_transport, AttestedProcessor, AttestedTransport, HttpTransport,
    ProcessingMode,
};
use crate::prover::{MockProver, ProofGenerator};
use crate::registry::{HashRegistry, InMemoryHashRegistry};
use crate::security::wipe::{BufferGuard, WipeOnDrop};
use crate::{log_debug, log_info};

use super::context::RunContext;
use super::state::{PipelineStage, StageTracker};
use super::types::{PipelineInput, PipelineOutput, PipelineOutputParts};

pub struct StudyPipeline {
    config: PipelineConfig,
    processor: Box<dyn AttestedProcessor>,
    prover: Arc<dyn ProofGenerator>,
    registry: Arc<dyn HashRegistry>,
    guard: DuplicateGuard,
}

/// Collaborators not supplied fall back to the mock prover, an empty
/// in-memory registry, no ledger, and the hyper transport.
pub struct StudyPipelineBuilder {
    config: PipelineConfig,
    processor: Option<Box<dyn AttestedProcessor>>,
    transport: Option<Arc<dyn AttestedTransport>>,
    prover: Option<Arc<dyn ProofGenerator>>,
    registry: Option<Arc<dyn HashRegistry>>,
    ledger: Option<Arc<dyn LedgerLookup>>,
}

impl StudyPipelineBuilder {
    /// Overrides the processor that `config.mode` would select.
    pub fn processor(mut self, processor: Box<dyn AttestedProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn AttestedTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn prover(mut self, prover: Arc<dyn ProofGenerator>) -> Self {
        self.prover = Some(prover);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn HashRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn LedgerLookup>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn build(self) -> Result<StudyPipeline, PipelineError> {
        self.config.validate()?;

        let processor = match self.processor {
            Some(processor) => processor,
            None => {
                let transport = self
                    .transport
                    .unwrap_or_else(|| Arc::new(HttpTransport::new()));
                build_processor_with_transport(&self.config, transport)?
            }
        };

        let prover = self
            .prover
            .unwrap_or_else(|| Arc::new(MockProver::new()));
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(InMemoryHashRegistry::new()));

        let guard = DuplicateGuard::new(
            Arc::clone(&registry),
            self.ledger,
            self.config.registry_timeout(),
            self.config.ledger_timeout(),
        );

        log::info!(
            "PIPELINE_BUILT mode={} processor={} max_document_bytes={}",
            self.config.mode,
            processor.mode(),
            self.config.max_document_bytes
        );

        Ok(StudyPipeline {
            config: self.config,
            processor,
            prover,
            registry,
            guard,
        })
    }
}

impl StudyPipeline {
    /// Pipeline with default collaborators for `config`.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::builder(config).build()
    }

    pub fn builder(config: PipelineConfig) -> StudyPipelineBuilder {
        StudyPipelineBuilder {
            config,
            processor: None,
            transport: None,
            prover: None,
            registry: None,
            ledger: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mode(&self) -> ProcessingMode {
        self.processor.mode()
    }

    pub fn registry(&self) -> &Arc<dyn HashRegistry> {
        &self.registry
    }

    /// Process one submission.
    ///
    /// The input buffer is all zeros when this returns, whatever the
    /// outcome, and also if the returned future is dropped early.
    pub async fn run(&self, input: PipelineInput<'_>) -> Result<PipelineOutput, PipelineError> {
        let PipelineInput {
            raw_buffer,
            submitter_identity,
            display_name,
        } = input;

        let run = RunContext::new(display_name.as_deref());
        let mut buffer = BufferGuard::new(raw_buffer);
        let mut stages = StageTracker::new(run.log_context());

        log_info!(
            run.log_context(),
            "RUN_START",
            mode = self.processor.mode(),
            bytes = buffer.len()
        );

        let outcome = self
            .execute(&mut buffer, &submitter_identity, &run, &mut stages)
            .await;

        if buffer.wipe() {
            log_debug!(run.log_context(), "BUFFER_WIPED", stage = stages.current());
        }

        match outcome {
            Ok(output) => {
                stages.complete(run.elapsed_ms());
                Ok(output)
            }
            Err(e) => {
                stages.fail(&e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        buffer: &mut BufferGuard<'_>,
        submitter_identity: &str,
        run: &RunContext,
        stages: &mut StageTracker,
    ) -> Result<PipelineOutput, PipelineError> {
        let ctx = run.log_context();

        self.validate_request(buffer, submitter_identity)?;

        // The processor only ever sees a copy, zeroed when this block ends.
        stages.advance(PipelineStage::Processing);
        let attested = {
            let copy = WipeOnDrop::copy_of(buffer.bytes());
            self.processor.process(copy.as_slice(), ctx).await?
        };
        let fingerprint = attested.content_fingerprint.as_str();

        stages.advance(PipelineStage::DuplicateCheck);
        let mut reservation = self.guard.reserve_unique(fingerprint, ctx).await?;

        stages.advance(PipelineStage::ProofGeneration);
        let proof = with_timeout(
            self.config.proof_timeout(),
            PipelineStage::ProofGeneration,
            self.prover.generate(fingerprint, &attested.attestation_token),
        )
        .await??;
        if proof.public_inputs[0] != fingerprint
            || proof.public_inputs[1] != attested.attestation_token
        {
            return Err(anyhow!("prover returned public inputs not bound to this run").into());
        }

        stages.advance(PipelineStage::Registering);
        let inserted = with_timeout(
            self.config.registry_timeout(),
            PipelineStage::Registering,
            reservation.commit(),
        )
        .await??;
        if !inserted {
            // Committed by a writer that bypassed the reservation.
            return Err(duplicate(fingerprint, DuplicateSource::Registry, ctx));
        }
        log_info!(ctx, "FINGERPRINT_REGISTERED", fingerprint = fingerprint);

        stages.advance(PipelineStage::Packaging);
        if buffer.wipe() {
            log_debug!(ctx, "BUFFER_WIPED", stage = PipelineStage::Packaging);
        }

        Ok(PipelineOutput::from_parts(PipelineOutputParts {
            run_id: run.run_id.clone(),
            content_fingerprint: attested.content_fingerprint.clone(),
            summary: attested.summary,
            attestation_token: attested.attestation_token,
            proof: proof.proof,
            public_inputs: proof.public_inputs,
            verification_key: proof.verification_key,
            submitter_identity: submitter_identity.to_string(),
            unix_timestamp: Utc::now().timestamp(),
            mode_used: attested.mode_used,
            used_fallback: attested.used_fallback,
        }))
    }

    fn validate_request(
        &self,
        buffer: &BufferGuard<'_>,
        submitter_identity: &str,
    ) -> Result<(), PipelineError> {
        if buffer.is_empty() {
            return Err(PipelineError::InvalidRequest("document is empty".to_string()));
        }
        if submitter_identity.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "submitter identity is empty".to_string(),
            ));
        }
        if buffer.len() > self.config.max_document_bytes {
            return Err(PipelineError::InvalidRequest(format!(
                "document of {} bytes exceeds limit of {} bytes",
                buffer.len(),
                self.config.max_document_bytes
            )));
        }
        Ok(())
    }
}

async fn with_timeout<F: std::future::Future>(
    limit: Duration,
    stage: PipelineStage,
    fut: F,
) -> Result<F::Output, PipelineError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| PipelineError::StageTimeout {
            stage: stage.as_str(),
        })
}
