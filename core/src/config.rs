use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::constants::*;
use crate::{BackoffRetryPolicy, Credential, Result, RetryPolicy, SignOptions};

/// User agent sent when the config does not set one.
///
/// ```text
/// attains-sdk-rust/{version}/{os}/{arch}
/// ```
pub static DEFAULT_USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "attains-sdk-rust/{}/{}/{}",
        SDK_VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
});

/// Config for an attains [`Client`](crate::Client).
///
/// The config is read-only once handed to a client and can be shared by
/// any number of concurrent calls.
#[derive(Clone)]
pub struct Config {
    /// Endpoint of the service, like `sms.attains.example` or
    /// `https://sms.attains.example:8443`.
    ///
    /// Overrides the endpoint set on each request.
    pub endpoint: Option<String>,
    /// User agent, defaults to [`DEFAULT_USER_AGENT`].
    pub user_agent: String,
    /// Credential used to sign requests.
    pub credential: Option<Credential>,
    /// Options passed to the signer.
    pub sign_options: SignOptions,
    /// Retry policy, defaults to [`BackoffRetryPolicy`].
    pub retry_policy: Arc<dyn RetryPolicy>,
    /// Proxy used by the transport for every call.
    pub proxy_url: Option<String>,
    /// Timeout of a single attempt.
    pub connection_timeout: Duration,
    /// Do not follow redirects.
    pub redirect_disabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            user_agent: DEFAULT_USER_AGENT.clone(),
            credential: None,
            sign_options: SignOptions::default(),
            retry_policy: Arc::new(BackoffRetryPolicy::default()),
            proxy_url: None,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            redirect_disabled: false,
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Credential redacts itself.
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("credential", &self.credential)
            .field("sign_options", &self.sign_options)
            .field("retry_policy", &self.retry_policy)
            .field("proxy_url", &self.proxy_url)
            .field("connection_timeout", &self.connection_timeout)
            .field("redirect_disabled", &self.redirect_disabled)
            .finish()
    }
}

impl Config {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the credential.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Build and set a credential from an access key pair.
    pub fn with_access_key(
        self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Result<Self> {
        let credential = Credential::new(access_key_id, secret_access_key)?;
        Ok(self.with_credential(credential))
    }

    /// Set the sign options.
    pub fn with_sign_options(mut self, options: SignOptions) -> Self {
        self.sign_options = options;
        self
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    /// Set the proxy used for every call.
    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Set the timeout of a single attempt.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Do not follow redirects.
    pub fn with_redirect_disabled(mut self, disabled: bool) -> Self {
        self.redirect_disabled = disabled;
        self
    }
}
