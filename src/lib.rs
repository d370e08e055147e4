//! Study Pipeline Core
//!
//! Attested processing pipeline for medical study submissions:
//! - Content fingerprinting and redacted summaries (mock, remote, or auto
//!   with fallback)
//! - Duplicate detection against the hash registry and the study ledger
//! - Proof generation over the fingerprint and attestation token only
//! - Packaging of a ledger-ready record
//!
//! The submitted buffer is zeroed before [`StudyPipeline::run`] returns,
//! on every exit path.
//!
//! ```no_run
//! use study_pipeline_core::{PipelineConfig, PipelineInput, StudyPipeline};
//!
//! # async fn submit() -> Result<(), study_pipeline_core::PipelineError> {
//! study_pipeline_core::init_logger();
//! let pipeline = StudyPipeline::new(PipelineConfig::from_env()?)?;
//!
//! let mut document = std::fs::read("study.pdf").unwrap_or_default();
//! let record = pipeline
//!     .run(PipelineInput::new(&mut document, "GCONTRIBUTOR"))
//!     .await?;
//! assert!(document.iter().all(|b| *b == 0));
//! println!("{}", record.content_fingerprint());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod prover;
pub mod registry;
pub mod security;

pub use config::PipelineConfig;
pub use error::{ErrorClass, PipelineError};
pub use ledger::{InMemoryStudyLedger, LedgerError, LedgerLookup, StudyRecord};
pub use pipeline::{PipelineInput, PipelineOutput, RecordStatus, StudyPipeline, StudyPipelineBuilder};
pub use processor::{
    AttestedProcessor, AttestedResult, AttestedTransport, ExecutionMode, ProcessingMode,
    ProcessorError, StudySummary,
};
pub use prover::{MockProver, ProofError, ProofGenerator, ProofResult};
pub use registry::{HashRegistry, InMemoryHashRegistry, RegistryError};

#[doc(hidden)]
pub use log as __log;

/// Install the env_logger backend at Info level. Safe to call repeatedly.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}
