//! Study processing pipeline.
//!
//! Coordinates one submission end to end:
//! - Attested processing (fingerprint, redacted summary, attestation)
//! - Duplicate detection against the registry and the ledger
//! - Proof generation over the fingerprint and attestation only
//! - Registry insert and packaging of the ledger-ready record

pub mod context;
pub mod orchestrator;
pub mod state;
pub mod types;

pub use context::RunContext;
pub use orchestrator::{StudyPipeline, StudyPipelineBuilder};
pub use state::PipelineStage;
pub use types::{PipelineInput, PipelineOutput, RecordStatus};

pub(crate) use types::PipelineOutputParts;
