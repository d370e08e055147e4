//! Attested processor client.
//!
//! One strategy per [`ProcessingMode`] behind the [`AttestedProcessor`]
//! trait:
//! - `mock` - [`MockProcessor`], local and deterministic
//! - `real` - [`RemoteProcessor`], the external backend over HTTP
//! - `auto` - [`FallbackProcessor`] around a `RemoteProcessor`
//!
//! Whatever runs, the output is normalized into [`AttestedResult`].

pub mod error;
pub mod fallback;
pub mod fingerprint;
pub mod json_path;
pub mod mock;
pub mod mode;
pub mod normalize;
pub mod remote;
pub mod transport;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::logging::structured::LogContext;

pub use error::ProcessorError;
pub use fallback::FallbackProcessor;
pub use fingerprint::{fingerprint, is_fingerprint, FINGERPRINT_HEX_LEN};
pub use mock::MockProcessor;
pub use mode::{ExecutionMode, ProcessingMode};
pub use remote::{BackendSettings, RemoteProcessor};
pub use transport::{
    AttestedTransport, HttpTransport, TransportError, TransportResponse, WipingBody,
};
pub use types::{AttestedResult, StudySummary};

/// Common interface of every processing strategy.
///
/// Implementations must not retain `document` (or anything derived from
/// its plaintext) beyond the call.
#[async_trait]
pub trait AttestedProcessor: Send + Sync {
    fn mode(&self) -> ProcessingMode;

    async fn process(
        &self,
        document: &[u8],
        ctx: &LogContext,
    ) -> Result<AttestedResult, ProcessorError>;
}

/// Build the processor for `config` using the hyper transport.
pub fn build_processor(config: &PipelineConfig) -> Result<Box<dyn AttestedProcessor>, ProcessorError> {
    build_processor_with_transport(config, Arc::new(HttpTransport::new()))
}

/// Build the processor for `config` over a caller-supplied transport.
///
/// Configuration is validated here, before any network I/O can happen.
pub fn build_processor_with_transport(
    config: &PipelineConfig,
    transport: Arc<dyn AttestedTransport>,
) -> Result<Box<dyn AttestedProcessor>, ProcessorError> {
    config.validate()?;

    let mode = config.mode;
    let processor: Box<dyn AttestedProcessor> = match config.backend_settings()? {
        None => Box::new(MockProcessor::new()),
        Some(settings) => {
            let remote = RemoteProcessor::new(settings, mode.fallback_available(), transport);
            match mode {
                ProcessingMode::Auto => Box::new(FallbackProcessor::new(Box::new(remote))),
                _ => Box::new(remote),
            }
        }
    };

    log::info!(
        "PROCESSOR_BUILT mode={} fallback_available={}",
        processor.mode(),
        mode.fallback_available()
    );

    Ok(processor)
}
