//! Reqwest based transport for attains clients.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use attains_core::{Config, Error, HttpSend, ProxyUrl, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use log::{debug, warn};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy, Request};

/// ReqwestHttpSend sends attains requests with a pooled [`reqwest::Client`].
///
/// Clients built by this crate are rebuilt on
/// [`close_idle_connections`](HttpSend::close_idle_connections), which drops
/// their idle pool. A client passed to [`ReqwestHttpSend::new`] is used as is.
///
/// Calls with a per-call proxy share one pooled client per proxy url.
#[derive(Debug)]
pub struct ReqwestHttpSend {
    client: RwLock<Client>,
    proxied: Mutex<HashMap<String, Client>>,
    settings: Option<Settings>,
}

#[derive(Debug, Clone, Default)]
struct Settings {
    timeout: Option<Duration>,
    redirect_disabled: bool,
    proxy_url: Option<String>,
}

impl Settings {
    fn build(&self) -> Result<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if self.redirect_disabled {
            builder = builder.redirect(Policy::none());
        }
        if let Some(url) = &self.proxy_url {
            let proxy = Proxy::all(url).map_err(|e| {
                Error::config_invalid(format!("invalid proxy url {url:?}")).with_source(e)
            })?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| Error::config_invalid("failed to build http client").with_source(e))
    }
}

impl Default for ReqwestHttpSend {
    fn default() -> Self {
        Self {
            client: RwLock::new(Client::new()),
            proxied: Mutex::default(),
            settings: Some(Settings::default()),
        }
    }
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    ///
    /// Per-call proxies are ignored and the pool is never rebuilt.
    pub fn new(client: Client) -> Self {
        Self {
            client: RwLock::new(client),
            proxied: Mutex::default(),
            settings: None,
        }
    }

    /// Create a ReqwestHttpSend following the timeout, redirect and proxy
    /// settings of `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = Settings {
            timeout: Some(config.connection_timeout),
            redirect_disabled: config.redirect_disabled,
            proxy_url: config.proxy_url.clone().filter(|v| !v.is_empty()),
        };
        let client = settings.build()?;

        Ok(Self {
            client: RwLock::new(client),
            proxied: Mutex::default(),
            settings: Some(settings),
        })
    }

    fn client(&self) -> Client {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pick the client for one call, honoring a per-call proxy.
    fn client_for(&self, proxy: Option<ProxyUrl>) -> Result<Client> {
        let Some(ProxyUrl(url)) = proxy else {
            return Ok(self.client());
        };

        let Some(settings) = &self.settings else {
            warn!("proxy {url} ignored by custom reqwest client");
            return Ok(self.client());
        };

        let mut proxied = self.proxied.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = proxied.get(&url) {
            return Ok(client.clone());
        }
        let client = Settings {
            proxy_url: Some(url.clone()),
            ..settings.clone()
        }
        .build()?;
        debug!("reqwest client built for proxy {url}");
        proxied.insert(url, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let client = self.client_for(req.extensions().get::<ProxyUrl>().cloned())?;

        let req = Request::try_from(req).map_err(from_reqwest_error)?;
        let resp: http::Response<_> = client
            .execute(req)
            .await
            .map_err(from_reqwest_error)?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(from_reqwest_error)?;
        Ok(http::Response::from_parts(parts, bs))
    }

    fn close_idle_connections(&self) {
        let Some(settings) = &self.settings else {
            return;
        };

        match settings.build() {
            Ok(client) => {
                *self.client.write().unwrap_or_else(PoisonError::into_inner) = client;
                self.proxied
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clear();
                debug!("reqwest client rebuilt, idle connections dropped");
            }
            Err(err) => warn!("failed to rebuild reqwest client: {err}"),
        }
    }
}

fn from_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_builder() {
        return Error::request_invalid("failed to build http request").with_source(err);
    }
    if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        return Error::network(format!("http request failed: {err}")).with_source(err);
    }
    Error::unexpected(format!("http request failed: {err}")).with_source(err)
}
