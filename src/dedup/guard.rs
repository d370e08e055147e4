//! Duplicate guard.
//!
//! Two sources with different failure policies. The hash registry is
//! authoritative: a hit or an error ends the run. The ledger is a
//! corroborating signal: a hit ends the run, an error is logged and
//! ignored.
//!
//! [`DuplicateGuard::reserve_unique`] also takes the registry reservation
//! first, so a concurrent run with the same content (in this pipeline or
//! any other sharing the registry) stops here, before proof generation.

use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;
use crate::ledger::{LedgerError, LedgerLookup};
use crate::logging::structured::LogContext;
use crate::pipeline::PipelineStage;
use crate::registry::{HashRegistry, Reservation, ReservationGuard};
use crate::{log_debug, log_info, log_warn};

/// Which source reported the duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSource {
    Registry,
    Ledger,
}

impl DuplicateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateSource::Registry => "registry",
            DuplicateSource::Ledger => "ledger",
        }
    }
}

pub struct DuplicateGuard {
    registry: Arc<dyn HashRegistry>,
    ledger: Option<Arc<dyn LedgerLookup>>,
    registry_timeout: Duration,
    ledger_timeout: Duration,
}

impl DuplicateGuard {
    pub fn new(
        registry: Arc<dyn HashRegistry>,
        ledger: Option<Arc<dyn LedgerLookup>>,
        registry_timeout: Duration,
        ledger_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ledger,
            registry_timeout,
            ledger_timeout,
        }
    }

    /// Reserve `fingerprint` in the registry, then run the duplicate
    /// check. The returned guard releases the reservation unless the
    /// caller commits it.
    pub async fn reserve_unique(
        &self,
        fingerprint: &str,
        ctx: &LogContext,
    ) -> Result<ReservationGuard, PipelineError> {
        let reservation =
            tokio::time::timeout(self.registry_timeout, self.registry.reserve(fingerprint))
                .await
                .map_err(|_| registry_timeout())??;

        match reservation {
            Reservation::Registered => {
                return Err(duplicate(fingerprint, DuplicateSource::Registry, ctx));
            }
            Reservation::InFlight => {
                log_info!(ctx, "CONTENT_IN_FLIGHT", fingerprint = fingerprint);
                return Err(PipelineError::InFlight {
                    fingerprint: fingerprint.to_string(),
                });
            }
            Reservation::Acquired => {}
        }

        let guard = ReservationGuard::new(Arc::clone(&self.registry), fingerprint);
        self.assert_not_duplicate(fingerprint, ctx).await?;
        Ok(guard)
    }

    pub async fn assert_not_duplicate(
        &self,
        fingerprint: &str,
        ctx: &LogContext,
    ) -> Result<(), PipelineError> {
        let in_registry = tokio::time::timeout(self.registry_timeout, self.registry.exists(fingerprint))
            .await
            .map_err(|_| registry_timeout())??;

        if in_registry {
            return Err(duplicate(fingerprint, DuplicateSource::Registry, ctx));
        }

        if self.ledger_reports(fingerprint, ctx).await {
            return Err(duplicate(fingerprint, DuplicateSource::Ledger, ctx));
        }

        log_debug!(ctx, "DUPLICATE_CHECK_PASSED", fingerprint = fingerprint);
        Ok(())
    }

    /// Best-effort ledger lookup. This is the only place a collaborator
    /// error is turned into an answer: an unreachable, undeployed or slow
    /// ledger reads as "not registered" so it cannot block submissions.
    async fn ledger_reports(&self, fingerprint: &str, ctx: &LogContext) -> bool {
        let Some(ledger) = &self.ledger else {
            return false;
        };

        let lookup = tokio::time::timeout(self.ledger_timeout, ledger.exists_on_chain(fingerprint))
            .await
            .unwrap_or_else(|_| {
                Err(LedgerError::Unavailable(format!(
                    "lookup exceeded {}ms",
                    self.ledger_timeout.as_millis()
                )))
            });

        match lookup {
            Ok(found) => found,
            Err(e) => {
                log_warn!(ctx, "LEDGER_LOOKUP_FAILED", error = e, treated_as = "not_duplicate");
                false
            }
        }
    }
}

fn registry_timeout() -> PipelineError {
    PipelineError::StageTimeout {
        stage: PipelineStage::DuplicateCheck.as_str(),
    }
}

pub(crate) fn duplicate(fingerprint: &str, source: DuplicateSource, ctx: &LogContext) -> PipelineError {
    log_info!(
        ctx,
        "DUPLICATE_FOUND",
        source = source.as_str(),
        fingerprint = fingerprint
    );
    PipelineError::DuplicateFound {
        fingerprint: fingerprint.to_string(),
    }
}
