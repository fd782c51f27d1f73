//! Core components of the attains cloud SDK.
//!
//! This crate provides request signing, retry policies and the dispatcher
//! that ties them together. The http transport is pluggable through
//! [`HttpSend`]; `attains-http-send-reqwest` provides one built on reqwest.
//!
//! ## Overview
//!
//! - [`RequestSigner`]: signs requests with the `attains-auth-v1` protocol
//! - [`RetryPolicy`]: decides whether a failed attempt is retried and when
//! - [`Request`] / [`Response`]: envelopes of one call
//! - [`Client`]: prepares, signs and sends requests, retrying with the same body
//!
//! ## Example
//!
//! ```no_run
//! use attains_core::{Client, Config, NoopHttpSend, Request, Result};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Balance {
//!     balance: i64,
//! }
//!
//! # async fn example() -> Result<()> {
//! let config = Config::new()
//!     .with_endpoint("https://sms.attains.example")
//!     .with_access_key("access_key_id", "secret_access_key")?;
//!
//! // Use a real transport like `attains-http-send-reqwest` here.
//! let client = Client::new(config, NoopHttpSend);
//!
//! let balance: Balance = client.call(Request::new().with_path("/balance")).await?;
//! println!("{balance:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: digest and hmac helpers used by the signer
//! - [`time`]: time formatting used on the wire
//! - [`utils`]: uri encoding and data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod constants;

mod error;
pub use error::{Error, ErrorKind, Result, ServiceErrorDisplay};
mod credential;
pub use credential::Credential;
mod http;
pub use http::{HttpSend, NoopHttpSend, ProxyUrl};
mod sign_request;
pub use sign_request::{
    canonical_headers, canonical_query, canonical_uri, RequestSigner, SignOptions, SignRequest,
};
mod retry;
pub use retry::{BackoffRetryPolicy, NoRetryPolicy, RetryPolicy};
mod request;
pub use request::{Body, Request};
mod response;
pub use response::{Envelope, Response};
mod config;
pub use config::{Config, DEFAULT_USER_AGENT};
mod client;
pub use client::Client;

pub use tokio_util::sync::CancellationToken;
