use attains_core::{Client, Config, Result};
use attains_http_send_reqwest::ReqwestHttpSend;

/// Create a client for `endpoint` signing with the given access key pair.
///
/// The client retries up to 3 times with exponential backoff from 300ms,
/// capped at 20s.
pub fn default_client(
    access_key_id: impl Into<String>,
    secret_access_key: impl Into<String>,
    endpoint: impl Into<String>,
) -> Result<Client> {
    let config = Config::new()
        .with_endpoint(endpoint)
        .with_access_key(access_key_id, secret_access_key)?;
    client_from_config(config)
}

/// Create a client from `config` using a reqwest transport that follows its
/// timeout, redirect and proxy settings.
pub fn client_from_config(config: Config) -> Result<Client> {
    let http = ReqwestHttpSend::from_config(&config)?;
    Ok(Client::new(config, http))
}
