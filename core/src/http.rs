use bytes::Bytes;
use std::fmt::Debug;

use crate::{Error, Result};

/// HttpSend is the transport used by [`Client`](crate::Client) to execute requests.
///
/// Implementations must be safe to share between concurrent calls. Connection
/// level failures must be reported as [`ErrorKind::Network`](crate::ErrorKind::Network)
/// so the retry policy can tell them apart from local errors.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response with its body fully read.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;

    /// Drop idle pooled connections.
    ///
    /// Called after a failed attempt so the next one does not reuse a broken
    /// connection. Other calls sharing the pool may be affected.
    fn close_idle_connections(&self) {}
}

/// Per-call proxy override, carried in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrl(pub String);

/// NoopHttpSend is a no-op implementation that always returns an error.
///
/// This is used when no HTTP client is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHttpSend;

#[async_trait::async_trait]
impl HttpSend for NoopHttpSend {
    async fn http_send(&self, _req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::config_invalid(
            "HTTP sending not supported: no HTTP client configured",
        ))
    }
}
