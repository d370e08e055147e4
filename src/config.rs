//! Pipeline configuration.
//!
//! Read once at orchestrator construction, either deserialized with serde
//! (keys as in the deployment manifest: `mode`, `endpointURL`, `apiKey`,
//! `timeoutMillis`, ...) or from `STUDY_PIPELINE_*` environment variables.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::processor::remote::BackendSettings;
use crate::processor::transport::parse_endpoint;
use crate::processor::{ProcessingMode, ProcessorError};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PROOF_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_LEDGER_TIMEOUT_MS: u64 = 3_000;
/// 50 MiB.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 50 * 1024 * 1024;

const ENV_PREFIX: &str = "STUDY_PIPELINE_";

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default)]
    pub mode: ProcessingMode,

    #[serde(default, rename = "endpointURL", alias = "endpointUrl")]
    pub endpoint_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_millis: u64,

    #[serde(default = "default_proof_timeout_ms")]
    pub proof_timeout_millis: u64,

    #[serde(default = "default_registry_timeout_ms")]
    pub registry_timeout_millis: u64,

    #[serde(default = "default_ledger_timeout_ms")]
    pub ledger_timeout_millis: u64,

    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_proof_timeout_ms() -> u64 {
    DEFAULT_PROOF_TIMEOUT_MS
}

fn default_registry_timeout_ms() -> u64 {
    DEFAULT_REGISTRY_TIMEOUT_MS
}

fn default_ledger_timeout_ms() -> u64 {
    DEFAULT_LEDGER_TIMEOUT_MS
}

fn default_max_document_bytes() -> usize {
    DEFAULT_MAX_DOCUMENT_BYTES
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::Mock,
            endpoint_url: None,
            api_key: None,
            timeout_millis: DEFAULT_TIMEOUT_MS,
            proof_timeout_millis: DEFAULT_PROOF_TIMEOUT_MS,
            registry_timeout_millis: DEFAULT_REGISTRY_TIMEOUT_MS,
            ledger_timeout_millis: DEFAULT_LEDGER_TIMEOUT_MS,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("mode", &self.mode)
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_millis", &self.timeout_millis)
            .field("proof_timeout_millis", &self.proof_timeout_millis)
            .field("registry_timeout_millis", &self.registry_timeout_millis)
            .field("ledger_timeout_millis", &self.ledger_timeout_millis)
            .field("max_document_bytes", &self.max_document_bytes)
            .finish()
    }
}

impl PipelineConfig {
    pub fn mock() -> Self {
        Self::default()
    }

    pub fn real(endpoint_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_backend(ProcessingMode::Real, endpoint_url.into(), api_key.into())
    }

    pub fn auto(endpoint_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_backend(ProcessingMode::Auto, endpoint_url.into(), api_key.into())
    }

    fn with_backend(mode: ProcessingMode, endpoint_url: String, api_key: String) -> Self {
        Self {
            mode,
            endpoint_url: Some(endpoint_url),
            api_key: Some(api_key),
            ..Self::default()
        }
    }

    pub fn with_timeout_millis(mut self, timeout_millis: u64) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }

    /// Read configuration from `STUDY_PIPELINE_*` environment variables.
    pub fn from_env() -> Result<Self, ProcessorError> {
        Self::from_lookup(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Build from a key lookup (`MODE`, `ENDPOINT_URL`, `API_KEY`,
    /// `TIMEOUT_MS`, `PROOF_TIMEOUT_MS`, `REGISTRY_TIMEOUT_MS`,
    /// `LEDGER_TIMEOUT_MS`, `MAX_DOCUMENT_BYTES`). Missing keys keep their
    /// defaults; unparseable values are configuration errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProcessorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup("MODE") {
            config.mode = mode.parse()?;
        }
        config.endpoint_url = lookup("ENDPOINT_URL").filter(|s| !s.trim().is_empty());
        config.api_key = lookup("API_KEY").filter(|s| !s.trim().is_empty());

        if let Some(v) = lookup("TIMEOUT_MS") {
            config.timeout_millis = parse_number("TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("PROOF_TIMEOUT_MS") {
            config.proof_timeout_millis = parse_number("PROOF_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("REGISTRY_TIMEOUT_MS") {
            config.registry_timeout_millis = parse_number("REGISTRY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("LEDGER_TIMEOUT_MS") {
            config.ledger_timeout_millis = parse_number("LEDGER_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("MAX_DOCUMENT_BYTES") {
            config.max_document_bytes = parse_number("MAX_DOCUMENT_BYTES", &v)?;
        }

        Ok(config)
    }

    /// Check the configuration for the selected mode.
    ///
    /// `real` and `auto` need an absolute http endpoint and a non-empty
    /// API key. All timeouts must be non-zero.
    pub fn validate(&self) -> Result<(), ProcessorError> {
        for (name, value) in [
            ("timeoutMillis", self.timeout_millis),
            ("proofTimeoutMillis", self.proof_timeout_millis),
            ("registryTimeoutMillis", self.registry_timeout_millis),
            ("ledgerTimeoutMillis", self.ledger_timeout_millis),
        ] {
            if value == 0 {
                return Err(ProcessorError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if self.max_document_bytes == 0 {
            return Err(ProcessorError::Configuration(
                "maxDocumentBytes must be greater than zero".to_string(),
            ));
        }

        if !self.mode.requires_backend() {
            return Ok(());
        }

        let endpoint = self
            .endpoint_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ProcessorError::Configuration(format!(
                    "endpointURL is required in {} mode",
                    self.mode
                ))
            })?;

        if self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .is_none()
        {
            return Err(ProcessorError::Configuration(format!(
                "apiKey is required in {} mode",
                self.mode
            )));
        }

        parse_endpoint(endpoint).map_err(|e| ProcessorError::Configuration(e.to_string()))?;

        Ok(())
    }

    /// Backend coordinates, or `None` in mock mode.
    pub fn backend_settings(&self) -> Result<Option<BackendSettings>, ProcessorError> {
        if !self.mode.requires_backend() {
            return Ok(None);
        }
        self.validate()?;

        Ok(Some(BackendSettings {
            endpoint_url: self.endpoint_url.clone().unwrap_or_default().trim().to_string(),
            api_key: self.api_key.clone().unwrap_or_default().trim().to_string(),
            timeout: self.timeout(),
        }))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_millis(self.proof_timeout_millis)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_millis(self.registry_timeout_millis)
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_timeout_millis)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ProcessorError> {
    value.trim().parse().map_err(|_| {
        ProcessorError::Configuration(format!(
            "{}{} must be a non-negative integer, got '{}'",
            ENV_PREFIX, key, value
        ))
    })
}
