use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::CODE_OK;
use crate::{Error, Result};

/// Envelope is the body shape returned by attains services.
///
/// ```json
/// {"code": 200, "message": "success", "data": {...}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Service status code, `200` on success.
    #[serde(default)]
    pub code: i64,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
    /// Payload, absent on failure or for calls without a result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Response holds the raw http response of a call and the value its
/// payload is decoded into.
///
/// The target is only written when the service reports success and
/// carries a payload; it keeps its previous value otherwise.
#[derive(Debug)]
pub struct Response<T> {
    raw: Option<http::Response<Bytes>>,
    target: T,
}

impl<T: Default> Default for Response<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Response<T> {
    /// Create a response decoding into `target`.
    pub fn new(target: T) -> Self {
        Self { raw: None, target }
    }

    /// Attach the raw http response.
    pub fn set_response(&mut self, resp: http::Response<Bytes>) -> &mut Self {
        self.raw = Some(resp);
        self
    }

    /// Raw http response of the last attempt, if any.
    pub fn raw(&self) -> Option<&http::Response<Bytes>> {
        self.raw.as_ref()
    }

    /// Http status of the raw response.
    pub fn status(&self) -> Option<http::StatusCode> {
        self.raw.as_ref().map(|resp| resp.status())
    }

    /// Decoded value.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Consume the response and return the decoded value.
    pub fn into_target(self) -> T {
        self.target
    }
}

impl<T: DeserializeOwned> Response<T> {
    /// Decode the raw body into the target.
    ///
    /// - `ErrorKind::Unexpected` if no raw response is attached.
    /// - `ErrorKind::Decode` if the body is not a valid envelope.
    /// - `ErrorKind::Service` if the envelope code is not `200`.
    ///
    /// The raw body is kept, so calling `parse` again decodes the same bytes.
    pub fn parse(&mut self) -> Result<()> {
        let Some(raw) = &self.raw else {
            return Err(Error::unexpected("no http response to parse"));
        };

        let envelope: Envelope<T> = serde_json::from_slice(raw.body()).map_err(|e| {
            Error::decode(format!(
                "failed to decode response body with status {}",
                raw.status()
            ))
            .with_source(e)
        })?;

        if envelope.code != CODE_OK {
            return Err(Error::service(envelope.code, envelope.message));
        }

        if let Some(data) = envelope.data {
            self.target = data;
        }
        Ok(())
    }
}
