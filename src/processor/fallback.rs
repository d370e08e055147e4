//! Auto mode: real backend first, mock exactly once on transient failure.

use async_trait::async_trait;

use crate::logging::structured::LogContext;

use super::error::ProcessorError;
use super::mode::ProcessingMode;
use super::mock::MockProcessor;
use super::types::AttestedResult;
use super::AttestedProcessor;

/// Wraps a primary processor with a single mock fallback.
///
/// Configuration errors from the primary are not transient and pass
/// through untouched.
pub struct FallbackProcessor {
    primary: Box<dyn AttestedProcessor>,
    fallback: MockProcessor,
}

impl FallbackProcessor {
    pub fn new(primary: Box<dyn AttestedProcessor>) -> Self {
        Self {
            primary,
            fallback: MockProcessor::new(),
        }
    }
}

#[async_trait]
impl AttestedProcessor for FallbackProcessor {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::Auto
    }

    async fn process(
        &self,
        document: &[u8],
        ctx: &LogContext,
    ) -> Result<AttestedResult, ProcessorError> {
        match self.primary.process(document, ctx).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_transient() => {
                crate::log_warn!(ctx, "FALLBACK_TO_MOCK", kind = e.kind(), error = e);
                let mut result = self.fallback.process(document, ctx).await?;
                result.used_fallback = true;
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }
}
