//! The seam between the SDK and the wire.
//!
//! The SDK never opens a socket. It hands a [`Transport`] an already
//! serialized request, a node and a deadline, and gets bytes back. A gRPC
//! channel pool implements this trait in production; an in-process ledger
//! implements it in tests.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::time::Instant;

use super::node::Endpoint;

/// One unary call: a gRPC method path and its protobuf-encoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: &'static str,
    pub payload: Bytes,
}

impl TransportRequest {
    pub fn new(method: &'static str, payload: impl Into<Bytes>) -> Self {
        Self {
            method,
            payload: payload.into(),
        }
    }
}

/// Why an exchange produced no response.
///
/// The first four mirror the gRPC codes worth retrying on another node;
/// `Fatal` means the request itself cannot be delivered anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("node unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("fatal transport error: {0}")]
    Fatal(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Fatal(_))
    }
}

/// Sends one request to one node.
///
/// Implementations must give up by `deadline`; the engine additionally
/// wraps every call in a timeout, so a transport that ignores it costs a
/// wasted attempt rather than a hang.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        node: &Endpoint,
        request: TransportRequest,
        deadline: Instant,
    ) -> Result<Bytes, TransportError>;
}
