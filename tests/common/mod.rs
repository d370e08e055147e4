//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use study_pipeline_core::logging::LogContext;
use study_pipeline_core::processor::{TransportError, TransportResponse};
use study_pipeline_core::security::WipeOnDrop;
use study_pipeline_core::{
    AttestedProcessor, AttestedResult, AttestedTransport, MockProver, ProcessingMode,
    ProcessorError, ProofError, ProofGenerator, ProofResult,
};

/// Mock prover that counts calls and can be told to fail or hang.
pub struct CountingProver {
    inner: MockProver,
    calls: AtomicUsize,
    behavior: ProverBehavior,
    submitted: Mutex<Vec<(String, String)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProverBehavior {
    Succeed,
    Fail,
    Hang,
    /// Yield to the scheduler once before proving.
    Yield,
    /// Prove over a different attestation token than the one supplied.
    Misbind,
}

impl CountingProver {
    pub fn new(behavior: ProverBehavior) -> Arc<Self> {
        Arc::new(Self {
            inner: MockProver::new(),
            calls: AtomicUsize::new(0),
            behavior,
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every (fingerprint, attestation) pair the prover was handed.
    pub fn submitted(&self) -> Vec<(String, String)> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl ProofGenerator for CountingProver {
    async fn generate(
        &self,
        fingerprint: &str,
        attestation_token: &str,
    ) -> Result<ProofResult, ProofError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .push((fingerprint.to_string(), attestation_token.to_string()));

        match self.behavior {
            ProverBehavior::Succeed => self.inner.prove(fingerprint, attestation_token),
            ProverBehavior::Fail => Err(ProofError::Backend("prover offline".to_string())),
            ProverBehavior::Hang => std::future::pending().await,
            ProverBehavior::Yield => {
                tokio::task::yield_now().await;
                self.inner.prove(fingerprint, attestation_token)
            }
            ProverBehavior::Misbind => self.inner.prove(fingerprint, "substituted-token"),
        }
    }
}

/// Transport that fails every request at the network layer.
#[derive(Default)]
pub struct FailingTransport {
    calls: AtomicUsize,
}

impl FailingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttestedTransport for FailingTransport {
    async fn post_json(
        &self,
        _url: &str,
        _api_key: &str,
        _body: WipeOnDrop,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Connect("connection refused".to_string()))
    }
}

/// Transport that always answers with the same status and JSON body.
pub struct CannedTransport {
    status: u16,
    body: Vec<u8>,
}

impl CannedTransport {
    pub fn json(status: u16, body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string().into_bytes(),
        })
    }
}

#[async_trait]
impl AttestedTransport for CannedTransport {
    async fn post_json(
        &self,
        _url: &str,
        _api_key: &str,
        _body: WipeOnDrop,
    ) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// Processor that never returns.
pub struct HangingProcessor;

#[async_trait]
impl AttestedProcessor for HangingProcessor {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::Real
    }

    async fn process(
        &self,
        _document: &[u8],
        _ctx: &LogContext,
    ) -> Result<AttestedResult, ProcessorError> {
        std::future::pending().await
    }
}

/// Processor that panics mid-run.
pub struct PanickingProcessor;

#[async_trait]
impl AttestedProcessor for PanickingProcessor {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::Real
    }

    async fn process(
        &self,
        _document: &[u8],
        _ctx: &LogContext,
    ) -> Result<AttestedResult, ProcessorError> {
        panic!("backend client bug");
    }
}

/// Deterministic document of `len` bytes, distinct per `seed`.
pub fn document(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

pub fn all_zero(buf: &[u8]) -> bool {
    buf.iter().all(|b| *b == 0)
}
