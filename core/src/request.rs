use std::fmt::{Debug, Formatter};

use bytes::Bytes;
use http::header::{HeaderName, CONTENT_TYPE};
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Upper bound of the buffer reserved up front for a reader body.
const MAX_PREALLOCATE: usize = 64 * 1024;

/// Body of an outbound request.
pub enum Body {
    /// In-memory bytes.
    Bytes(Bytes),
    /// A reader with known or unknown length.
    Reader {
        /// Source of the body.
        reader: Box<dyn AsyncRead + Send + Unpin>,
        /// Length of the body if known in advance.
        size: Option<u64>,
    },
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Bytes(bs) => f.debug_tuple("Bytes").field(&bs.len()).finish(),
            Body::Reader { size, .. } => f.debug_struct("Reader").field("size", size).finish(),
        }
    }
}

impl Body {
    /// Read the whole body into memory.
    ///
    /// Returns an error if a reader with known size yields a different number
    /// of bytes.
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            Body::Bytes(bs) => Ok(bs),
            Body::Reader { mut reader, size } => {
                // Declared size is a hint only.
                let hint = size
                    .and_then(|v| usize::try_from(v).ok())
                    .map_or(0, |v| v.min(MAX_PREALLOCATE));
                let mut buf = Vec::with_capacity(hint);
                reader.read_to_end(&mut buf).await?;

                if let Some(size) = size {
                    if buf.len() as u64 != size {
                        return Err(Error::request_invalid(format!(
                            "body size mismatch: expected {size} bytes, got {}",
                            buf.len()
                        )));
                    }
                }
                Ok(buf.into())
            }
        }
    }
}

/// Request is the envelope of one outbound call.
///
/// It is built by the caller and handed to [`Client::send`](crate::Client::send);
/// the client fills in the defaults, signs and dispatches it.
///
/// `path` is kept unencoded, the client encodes it on the wire.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) endpoint: Option<String>,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Body>,
    pub(crate) request_id: Option<String>,
    pub(crate) proxy_url: Option<String>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::GET,
            endpoint: None,
            path: "/".to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            request_id: None,
            proxy_url: None,
            cancel: None,
        }
    }
}

impl Request {
    /// Create a new `GET /` request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the http method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the endpoint used when the client config does not carry one.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the path.
    ///
    /// A query string embedded in the path is split off and merged into the
    /// query parameters:
    ///
    /// ```
    /// use attains_core::Request;
    ///
    /// let req = Request::new().with_path("/signature/list?pageNo=1&pageSize=10");
    /// assert_eq!(req.path(), "/signature/list");
    /// assert_eq!(req.query().len(), 2);
    /// ```
    pub fn with_path(mut self, path: &str) -> Self {
        match path.split_once('?') {
            Some((path, query)) => {
                self.path = path.to_string();
                self.query.extend(
                    form_urlencoded::parse(query.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned())),
                );
            }
            None => self.path = path.to_string(),
        }
        self
    }

    /// Merge query parameters, duplicated keys are kept.
    pub fn with_query<I, K, V>(mut self, query: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(query.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Push a single query parameter.
    pub fn with_query_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a header value, existing values of the same name are kept.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Merge headers, existing values of the same name are kept.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        let mut last = None;
        for (name, value) in headers {
            // `None` means the same name as the previous entry.
            if let Some(name) = name {
                last = Some(name);
            }
            if let Some(name) = &last {
                self.headers.append(name.clone(), value);
            }
        }
        self
    }

    /// Set the content type, replacing any previous one.
    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.headers.insert(CONTENT_TYPE, content_type);
        self
    }

    /// Set an in-memory body.
    pub fn with_body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(Body::Bytes(body.into()));
        self
    }

    /// Set a streaming body, `size` is the length if known.
    pub fn with_body_reader(
        mut self,
        reader: impl AsyncRead + Send + Unpin + 'static,
        size: Option<u64>,
    ) -> Self {
        self.body = Some(Body::Reader {
            reader: Box::new(reader),
            size,
        });
        self
    }

    /// Set the request id, a new one is generated when absent.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Send this request through the given proxy.
    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Abort the call, including pending retries, once the token is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Get the http method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the endpoint override.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Get the unencoded path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the query parameters in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the body.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Get the caller assigned request id.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Get the proxy override.
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    /// Get the cancellation token.
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }
}
