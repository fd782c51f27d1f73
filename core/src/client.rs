//! Retrying dispatcher for attains requests.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, USER_AGENT};
use http::request::Parts;
use http::{HeaderValue, Method};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::constants::*;
use crate::hash::base64_md5;
use crate::http::ProxyUrl;
use crate::time::{format_iso8601, now};
use crate::utils::uri_encode;
use crate::{
    Config, Error, ErrorKind, HttpSend, Request, RequestSigner, Response, Result, SignRequest,
};

/// Client prepares, signs and dispatches attains requests.
///
/// A client is cheap to clone and safe to share between tasks; all state
/// of a call lives in the call itself.
#[derive(Clone, Debug)]
pub struct Client {
    config: Arc<Config>,
    http: Arc<dyn HttpSend>,
    signer: Arc<dyn SignRequest>,
}

impl Client {
    /// Create a new client signing with [`RequestSigner`].
    pub fn new(config: Config, http: impl HttpSend) -> Self {
        Self {
            config: Arc::new(config),
            http: Arc::new(http),
            signer: Arc::new(RequestSigner::new()),
        }
    }

    /// Replace the signer.
    pub fn with_signer(mut self, signer: impl SignRequest) -> Self {
        self.signer = Arc::new(signer);
        self
    }

    /// Get the config of this client.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send the request and decode the response into `resp`.
    ///
    /// Network failures and retryable service codes are retried following
    /// the configured retry policy. The request body is sent identically on
    /// every attempt.
    ///
    /// `resp` keeps the raw response of the last attempt, its target is
    /// written only on success.
    pub async fn send<T: DeserializeOwned>(
        &self,
        req: Request,
        resp: &mut Response<T>,
    ) -> Result<()> {
        let cancel = req.cancel.clone();
        if cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(Error::cancelled("request cancelled before sending"));
        }

        let mut prepared = self.prepare(req).await?;
        self.signer.sign_request(
            &mut prepared.parts,
            self.config.credential.as_ref(),
            &self.config.sign_options,
        )?;

        let policy = &self.config.retry_policy;
        let mut attempts: u32 = 0;
        loop {
            debug!(
                "attains request {} attempt {}: {} {}",
                prepared.request_id, attempts, prepared.parts.method, prepared.parts.uri
            );

            let sent = cancellable(
                cancel.as_ref(),
                self.http.http_send(prepared.attempt()?),
                "sending",
            )
            .await?;

            let raw = match sent {
                Ok(raw) => raw,
                Err(err) if err.kind() == ErrorKind::Network => {
                    self.http.close_idle_connections();

                    if !policy.should_retry(Some(&err), attempts) {
                        return Err(Error::retries_exhausted(format!(
                            "execute http request failed! Retried {attempts} times, error: {err}"
                        ))
                        .with_source(err));
                    }

                    let delay = policy.delay_before_next(Some(&err), attempts);
                    warn!(
                        "attains request {} failed: {err}, retry in {delay:?}",
                        prepared.request_id
                    );
                    cancellable(cancel.as_ref(), tokio::time::sleep(delay), "waiting to retry")
                        .await?;
                    attempts += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            debug!(
                "attains request {} got response status {}, body: {}",
                prepared.request_id,
                raw.status(),
                String::from_utf8_lossy(raw.body())
            );
            // A failed upload may leave the connection in an unknown state.
            if raw.status().as_u16() >= 400
                && matches!(prepared.parts.method, Method::POST | Method::PUT)
            {
                self.http.close_idle_connections();
            }

            resp.set_response(raw);
            let err = match resp.parse() {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            if err.kind() != ErrorKind::Service || !policy.should_retry(Some(&err), attempts) {
                return Err(err);
            }

            let delay = policy.delay_before_next(Some(&err), attempts);
            warn!(
                "attains request {} got {}, retry in {delay:?}",
                prepared.request_id,
                err.service_display()
            );
            cancellable(cancel.as_ref(), tokio::time::sleep(delay), "waiting to retry").await?;
            attempts += 1;
        }
    }

    /// Send the request and return the decoded payload.
    ///
    /// A successful response without payload yields `T::default()`.
    pub async fn call<T: DeserializeOwned + Default>(&self, req: Request) -> Result<T> {
        let mut resp = Response::new(T::default());
        self.send(req, &mut resp).await?;
        Ok(resp.into_target())
    }

    /// Fill in endpoint, default headers and body digests.
    async fn prepare(&self, req: Request) -> Result<Prepared> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .or(req.endpoint.as_deref())
            .ok_or_else(|| Error::config_invalid("endpoint is not set"))?;
        let (scheme, host) = resolve_endpoint(endpoint)?;

        let path = if req.path.starts_with('/') {
            req.path.clone()
        } else {
            format!("/{}", req.path)
        };
        let mut uri = format!("{scheme}://{host}{}", uri_encode(&path, false));
        if !req.query.is_empty() {
            uri.push('?');
            uri.push_str(
                &form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(req.query.iter())
                    .finish(),
            );
        }

        let mut headers = req.headers;
        headers.insert(HOST, HeaderValue::from_str(&host)?);
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_str(&self.config.user_agent)?);
        }
        // Wall clock, a fixed sign timestamp only applies to the signature.
        headers.insert(X_ATTAINS_DATE, HeaderValue::from_str(&format_iso8601(now()))?);

        let request_id = req
            .request_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        headers.insert(X_ATTAINS_REQUEST_ID, HeaderValue::from_str(&request_id)?);

        let body = match req.body {
            Some(body) => {
                let body =
                    cancellable(req.cancel.as_ref(), body.into_bytes(), "reading body").await??;
                if !headers.contains_key(CONTENT_LENGTH) {
                    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
                }
                if !headers.contains_key(CONTENT_MD5) {
                    headers.insert(CONTENT_MD5, HeaderValue::from_str(&base64_md5(&body))?);
                }
                body
            }
            None => Bytes::new(),
        };

        let (mut parts, _) = http::Request::builder()
            .method(req.method)
            .uri(uri)
            .body(())?
            .into_parts();
        parts.headers = headers;

        debug!(
            "attains request {request_id} prepared: {} {}",
            parts.method, parts.uri
        );

        Ok(Prepared {
            parts,
            body,
            proxy: req.proxy_url.map(ProxyUrl),
            request_id,
        })
    }
}

/// A signed request ready to be sent any number of times.
#[derive(Debug)]
struct Prepared {
    parts: Parts,
    /// Replay buffer, every attempt sends exactly these bytes.
    body: Bytes,
    proxy: Option<ProxyUrl>,
    request_id: String,
}

impl Prepared {
    /// Build a fresh http request for one attempt.
    fn attempt(&self) -> Result<http::Request<Bytes>> {
        let mut req = http::Request::builder()
            .method(self.parts.method.clone())
            .uri(self.parts.uri.clone())
            .version(self.parts.version)
            .body(self.body.clone())?;
        *req.headers_mut() = self.parts.headers.clone();
        if let Some(proxy) = &self.proxy {
            req.extensions_mut().insert(proxy.clone());
        }
        Ok(req)
    }
}

/// Run `fut` unless `token` is cancelled first.
async fn cancellable<F: Future>(
    token: Option<&CancellationToken>,
    fut: F,
    stage: &str,
) -> Result<F::Output> {
    match token {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::cancelled(format!("request cancelled while {stage}"))),
            out = fut => Ok(out),
        },
        None => Ok(fut.await),
    }
}

/// Split an endpoint into scheme and host.
///
/// The scheme defaults to `http`, anything other than `http` or `https`
/// is replaced by `http`. A trailing `:` without port is dropped.
fn resolve_endpoint(endpoint: &str) -> Result<(&'static str, String)> {
    let endpoint = endpoint.trim();
    let (scheme, rest) = match endpoint.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("https") => ("https", rest),
        Some((_, rest)) => ("http", rest),
        None => ("http", endpoint),
    };

    let host = rest.split(['/', '?']).next().unwrap_or_default();
    let host = host.strip_suffix(':').unwrap_or(host);
    if host.is_empty() {
        return Err(Error::config_invalid(format!(
            "endpoint {endpoint:?} has no host"
        )));
    }
    Ok((scheme, host.to_string()))
}
