//! Run state machine.
//!
//! `Init -> Processing -> DuplicateCheck -> ProofGeneration -> Registering
//! -> Packaging -> Done`, with `Failed` reachable from any non-terminal
//! stage.

use std::fmt;

use crate::error::{ErrorClass, PipelineError};
use crate::logging::structured::LogContext;
use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    Processing,
    DuplicateCheck,
    ProofGeneration,
    Registering,
    Packaging,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Init => "init",
            PipelineStage::Processing => "processing",
            PipelineStage::DuplicateCheck => "duplicate_check",
            PipelineStage::ProofGeneration => "proof_generation",
            PipelineStage::Registering => "registering",
            PipelineStage::Packaging => "packaging",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// The single forward successor, if any.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Init => Some(PipelineStage::Processing),
            PipelineStage::Processing => Some(PipelineStage::DuplicateCheck),
            PipelineStage::DuplicateCheck => Some(PipelineStage::ProofGeneration),
            PipelineStage::ProofGeneration => Some(PipelineStage::Registering),
            PipelineStage::Registering => Some(PipelineStage::Packaging),
            PipelineStage::Packaging => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    pub fn can_transition_to(&self, to: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == PipelineStage::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and logs the stage of one run. A tracker dropped before a
/// terminal stage means the run was cancelled or panicked.
pub(crate) struct StageTracker {
    ctx: LogContext,
    current: PipelineStage,
}

impl StageTracker {
    pub fn new(ctx: &LogContext) -> Self {
        Self {
            ctx: ctx.clone(),
            current: PipelineStage::Init,
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    pub fn advance(&mut self, to: PipelineStage) {
        debug_assert!(
            self.current.can_transition_to(to),
            "illegal stage transition {} -> {}",
            self.current,
            to
        );
        log_debug!(self.ctx, "STAGE_ENTER", stage = to, from = self.current);
        self.current = to;
    }

    pub fn complete(&mut self, elapsed_ms: i64) {
        self.advance(PipelineStage::Done);
        log_info!(self.ctx, "RUN_COMPLETE", elapsed_ms = elapsed_ms);
    }

    pub fn fail(&mut self, err: &PipelineError) {
        let stage = self.current;
        self.current = PipelineStage::Failed;
        match err.class() {
            ErrorClass::Defect | ErrorClass::Internal => log_error!(
                self.ctx,
                "RUN_FAILED",
                stage = stage,
                kind = err.kind(),
                class = err.class().as_str(),
                error = err
            ),
            class => log_warn!(
                self.ctx,
                "RUN_FAILED",
                stage = stage,
                kind = err.kind(),
                class = class.as_str()
            ),
        }
    }
}

impl Drop for StageTracker {
    fn drop(&mut self) {
        if !self.current.is_terminal() {
            log_warn!(self.ctx, "RUN_ABANDONED", stage = self.current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain() {
        let mut stage = PipelineStage::Init;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(stage.can_transition_to(next));
            stage = next;
            seen.push(stage);
        }
        assert_eq!(stage, PipelineStage::Done);
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        assert!(PipelineStage::Processing.can_transition_to(PipelineStage::Failed));
        assert!(PipelineStage::Packaging.can_transition_to(PipelineStage::Failed));
        assert!(!PipelineStage::Done.can_transition_to(PipelineStage::Failed));
        assert!(!PipelineStage::Failed.can_transition_to(PipelineStage::Init));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!PipelineStage::Processing.can_transition_to(PipelineStage::ProofGeneration));
        assert!(!PipelineStage::DuplicateCheck.can_transition_to(PipelineStage::Registering));
    }

    #[test]
    fn test_tracker() {
        let ctx = LogContext::new("run-state");
        let mut tracker = StageTracker::new(&ctx);
        tracker.advance(PipelineStage::Processing);
        tracker.fail(&PipelineError::InvalidRequest("x".into()));
        assert_eq!(tracker.current(), PipelineStage::Failed);
    }
}
