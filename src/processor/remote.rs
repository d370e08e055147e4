//! Real attested backend client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};

use crate::logging::structured::LogContext;
use crate::security::wipe::WipeOnDrop;

use super::error::ProcessorError;
use super::fingerprint::fingerprint;
use super::mode::ProcessingMode;
use super::normalize::normalize_response;
use super::transport::{AttestedTransport, TransportError};
use super::types::AttestedResult;
use super::AttestedProcessor;

/// Path appended to the configured base URL.
pub const PROCESS_PATH: &str = "/v1/process";

/// HTTP status the backend uses for rate and quota rejections.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Validated backend coordinates.
#[derive(Clone)]
pub struct BackendSettings {
    pub endpoint_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the external attested-processing service.
pub struct RemoteProcessor {
    process_url: String,
    api_key: String,
    timeout: Duration,
    fallback_available: bool,
    transport: Arc<dyn AttestedTransport>,
}

impl RemoteProcessor {
    /// `fallback_available` is reported on every transient error; set it
    /// when this client is wrapped by the auto-mode fallback.
    pub fn new(
        settings: BackendSettings,
        fallback_available: bool,
        transport: Arc<dyn AttestedTransport>,
    ) -> Self {
        Self {
            process_url: format!(
                "{}{}",
                settings.endpoint_url.trim_end_matches('/'),
                PROCESS_PATH
            ),
            api_key: settings.api_key,
            timeout: settings.timeout,
            fallback_available,
            transport,
        }
    }

    pub fn process_url(&self) -> &str {
        &self.process_url
    }

    fn timeout_error(&self) -> ProcessorError {
        ProcessorError::Timeout {
            timeout_ms: self.timeout.as_millis() as u64,
            fallback_available: self.fallback_available,
        }
    }
}

/// JSON request body: `{"encoding":"base64","document":"<b64>"}`.
///
/// Built by hand so the only copies of the encoded document are buffers
/// this function returns inside a [`WipeOnDrop`].
fn encode_request(document: &[u8]) -> WipeOnDrop {
    let encoded = WipeOnDrop::new(general_purpose::STANDARD.encode(document).into_bytes());

    let prefix: &[u8] = br#"{"encoding":"base64","document":""#;
    let suffix: &[u8] = br#""}"#;
    let mut body = Vec::with_capacity(prefix.len() + encoded.as_slice().len() + suffix.len());
    body.extend_from_slice(prefix);
    body.extend_from_slice(encoded.as_slice());
    body.extend_from_slice(suffix);

    WipeOnDrop::new(body)
}

#[async_trait]
impl AttestedProcessor for RemoteProcessor {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::Real
    }

    async fn process(
        &self,
        document: &[u8],
        ctx: &LogContext,
    ) -> Result<AttestedResult, ProcessorError> {
        let started = Instant::now();
        let content_fingerprint = fingerprint(document);

        log::info!(
            "{} REAL_PROCESS_START url={} bytes={} timeout_ms={}",
            ctx,
            self.process_url,
            document.len(),
            self.timeout.as_millis()
        );

        let response = {
            let call = self.transport.post_json(
                &self.process_url,
                &self.api_key,
                encode_request(document),
            );
            tokio::time::timeout(self.timeout, call).await
        };

        let response = match response {
            Err(_elapsed) => {
                log::warn!(
                    "{} REAL_PROCESS_TIMEOUT elapsed_ms={}",
                    ctx,
                    started.elapsed().as_millis()
                );
                return Err(self.timeout_error());
            }
            Ok(Err(TransportError::InvalidEndpoint(detail))) => {
                return Err(ProcessorError::Configuration(detail));
            }
            Ok(Err(e)) => {
                log::warn!("{} REAL_PROCESS_TRANSPORT_FAILED error={}", ctx, e);
                return Err(ProcessorError::network(e.to_string(), self.fallback_available));
            }
            Ok(Ok(response)) => response,
        };

        if response.status == STATUS_TOO_MANY_REQUESTS {
            log::warn!("{} REAL_PROCESS_QUOTA_EXCEEDED status={}", ctx, response.status);
            return Err(ProcessorError::QuotaExceeded {
                detail: String::from_utf8_lossy(&response.body).chars().take(200).collect(),
                fallback_available: self.fallback_available,
            });
        }

        if !response.is_success() {
            log::warn!("{} REAL_PROCESS_BAD_STATUS status={}", ctx, response.status);
            return Err(ProcessorError::network(
                format!("backend returned status {}", response.status),
                self.fallback_available,
            ));
        }

        let parsed: serde_json::Value = serde_json::from_slice(&response.body).map_err(|e| {
            ProcessorError::network(
                format!("malformed response: {}", e),
                self.fallback_available,
            )
        })?;

        let result = normalize_response(
            &parsed,
            &content_fingerprint,
            self.fallback_available,
            ctx,
        )?;

        log::info!(
            "{} REAL_PROCESS_COMPLETE fingerprint={} elapsed_ms={}",
            ctx,
            result.content_fingerprint,
            started.elapsed().as_millis()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::mode::ExecutionMode;
    use crate::processor::transport::TransportResponse;
    use parking_lot::Mutex;

    /// Replies with a fixed outcome and records what it was sent.
    struct CannedTransport {
        reply: Result<TransportResponse, TransportError>,
        delay: Duration,
        seen: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl CannedTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(TransportResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: TransportError) -> Self {
            Self {
                reply: Err(err),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AttestedTransport for CannedTransport {
        async fn post_json(
            &self,
            url: &str,
            api_key: &str,
            body: WipeOnDrop,
        ) -> Result<TransportResponse, TransportError> {
            self.seen.lock().push((
                url.to_string(),
                api_key.to_string(),
                body.as_slice().to_vec(),
            ));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply.clone()
        }
    }

    fn settings(timeout_ms: u64) -> BackendSettings {
        BackendSettings {
            endpoint_url: "http://attest.internal:8080/".to_string(),
            api_key: "key-123".to_string(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn ctx() -> LogContext {
        LogContext::new("run-remote")
    }

    #[tokio::test]
    async fn test_success_normalizes_and_sends_base64() {
        let transport = Arc::new(CannedTransport::replying(
            200,
            r#"{"attestation":"quote-1","summary":{"age_bucket":"30-39","condition":"oncology"}}"#,
        ));
        let processor = RemoteProcessor::new(settings(1000), false, transport.clone());

        let result = processor.process(b"hello", &ctx()).await.unwrap();
        assert_eq!(result.mode_used, ExecutionMode::Real);
        assert_eq!(result.content_fingerprint, fingerprint(b"hello"));
        assert_eq!(result.attestation_token, "quote-1");

        let seen = transport.seen.lock();
        let (url, key, body) = &seen[0];
        assert_eq!(url, "http://attest.internal:8080/v1/process");
        assert_eq!(key, "key-123");
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(body["encoding"], "base64");
        assert_eq!(body["document"], "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let transport = Arc::new(CannedTransport::replying(429, "slow down"));
        let processor = RemoteProcessor::new(settings(1000), true, transport);

        let err = processor.process(b"x", &ctx()).await.unwrap_err();
        assert_eq!(
            err,
            ProcessorError::QuotaExceeded {
                detail: "slow down".to_string(),
                fallback_available: true
            }
        );
    }

    #[tokio::test]
    async fn test_bad_status_is_network() {
        let transport = Arc::new(CannedTransport::replying(503, ""));
        let processor = RemoteProcessor::new(settings(1000), false, transport);

        let err = processor.process(b"x", &ctx()).await.unwrap_err();
        assert_eq!(err.kind(), "network");
        assert!(!err.fallback_available());
    }

    #[tokio::test]
    async fn test_transport_failure_is_network() {
        let transport = Arc::new(CannedTransport::failing(TransportError::Connect(
            "refused".into(),
        )));
        let processor = RemoteProcessor::new(settings(1000), false, transport);

        let err = processor.process(b"x", &ctx()).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Network { .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_network() {
        let transport = Arc::new(CannedTransport::replying(200, "<html>"));
        let processor = RemoteProcessor::new(settings(1000), false, transport);

        let err = processor.process(b"x", &ctx()).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Network { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let mut transport = CannedTransport::replying(200, r#"{"attestation":"late"}"#);
        transport.delay = Duration::from_secs(60);
        let processor = RemoteProcessor::new(settings(250), false, Arc::new(transport));

        let err = processor.process(b"x", &ctx()).await.unwrap_err();
        assert_eq!(
            err,
            ProcessorError::Timeout {
                timeout_ms: 250,
                fallback_available: false
            }
        );
    }

    #[test]
    fn test_encode_request_shape() {
        let body = encode_request(b"\x00\x01\x02");
        let parsed: serde_json::Value = serde_json::from_slice(body.as_slice()).unwrap();
        assert_eq!(parsed["document"], "AAEC");
    }

    #[test]
    fn test_settings_debug_redacts_key() {
        let rendered = format!("{:?}", settings(10));
        assert!(!rendered.contains("key-123"));
        assert!(rendered.contains("<redacted>"));
    }
}
