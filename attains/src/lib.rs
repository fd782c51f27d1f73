//! Signing and dispatching Attains Cloud API requests.
//!
//! This crate re-exports [`attains_core`] and, with the `default-client`
//! feature (on by default), a reqwest based transport.
//!
//! ```no_run
//! # async fn example() -> attains::Result<()> {
//! let client = attains::default_client("access_key_id", "secret_access_key", "sms.attains.example")?;
//!
//! let balance: serde_json::Value = client
//!     .call(attains::Request::new().with_path("/balance"))
//!     .await?;
//! println!("{balance}");
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use attains_core::*;

#[cfg(feature = "default-client")]
mod default_client;
#[cfg(feature = "default-client")]
pub use attains_http_send_reqwest::ReqwestHttpSend;
#[cfg(feature = "default-client")]
pub use default_client::{client_from_config, default_client};
