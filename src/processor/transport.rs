//! HTTP transport to the attested-processing backend.
//!
//! Plain HTTP/1.1 over TCP with hyper. TLS to the outside world is
//! terminated by the egress proxy the endpoint URL points at.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Buf;
use http_body_util::BodyExt;
use hyper::body::{Body, Frame, SizeHint};
use hyper::client::conn::http1;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use hyper::{Method, Request, Uri};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::security::wipe::WipeOnDrop;

/// Raw backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("http error: {0}")]
    Http(String),
}

/// Sends one JSON request to the backend.
///
/// The transport takes ownership of the body so the bytes are zeroed
/// when the request is written or abandoned. Timeouts are applied by the
/// caller; implementations may block for as long as the peer does.
#[async_trait]
pub trait AttestedTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: WipeOnDrop,
    ) -> Result<TransportResponse, TransportError>;
}

/// Request body chunk backed by a [`WipeOnDrop`].
pub struct WipingChunk {
    bytes: WipeOnDrop,
    pos: usize,
}

impl Buf for WipingChunk {
    fn remaining(&self) -> usize {
        self.bytes.as_slice().len() - self.pos
    }

    fn chunk(&self) -> &[u8] {
        &self.bytes.as_slice()[self.pos..]
    }

    fn advance(&mut self, cnt: usize) {
        self.pos = (self.pos + cnt).min(self.bytes.as_slice().len());
    }
}

/// Single-frame request body that never copies into a `Bytes`.
///
/// The frame is handed to hyper by value and zeroed when hyper drops it.
pub struct WipingBody {
    chunk: Option<WipingChunk>,
    len: usize,
}

impl WipingBody {
    pub fn new(bytes: WipeOnDrop) -> Self {
        let len = bytes.as_slice().len();
        let chunk = (len > 0).then(|| WipingChunk { bytes, pos: 0 });
        Self { chunk, len }
    }
}

impl Body for WipingBody {
    type Data = WipingChunk;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.chunk.take().map(|chunk| Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.chunk.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.len as u64)
    }
}

/// hyper-based transport, one connection per request.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Check that `url` is an absolute `http://` URL with a host.
pub fn parse_endpoint(url: &str) -> Result<Uri, TransportError> {
    let uri: Uri = url
        .parse()
        .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", url, e)))?;

    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => {
            return Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme '{}' (expected http behind the egress proxy)",
                other
            )))
        }
        None => {
            return Err(TransportError::InvalidEndpoint(format!(
                "{}: missing scheme",
                url
            )))
        }
    }

    if uri.host().map(str::is_empty).unwrap_or(true) {
        return Err(TransportError::InvalidEndpoint(format!("{}: missing host", url)));
    }

    Ok(uri)
}

#[async_trait]
impl AttestedTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: WipeOnDrop,
    ) -> Result<TransportResponse, TransportError> {
        let uri = parse_endpoint(url)?;
        let host = uri.host().unwrap_or_default().to_string();
        let port = uri.port_u16().unwrap_or(80);
        let authority = uri
            .authority()
            .map(|a| a.to_string())
            .unwrap_or_else(|| host.clone());
        let path = uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| TransportError::Connect(format!("{}:{}: {}", host, port, e)))?;

        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| TransportError::Http(format!("handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                log::debug!("BACKEND_CONNECTION_CLOSED error={}", e);
            }
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(HOST, authority)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .header(CONTENT_TYPE, "application/json")
            .body(WipingBody::new(body))
            .map_err(|e| TransportError::Http(format!("request build failed: {}", e)))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| TransportError::Http(format!("send failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::Http(format!("body read failed: {}", e)))?
            .to_bytes()
            .to_vec();

        Ok(TransportResponse { status, body })
    }
}
