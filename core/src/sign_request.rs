//! Attains auth v1 request signer.
use std::collections::HashSet;
use std::fmt::Debug;
use std::fmt::Write;

use http::header::AUTHORIZATION;
use http::request::Parts;
use http::HeaderMap;
use http::HeaderValue;
use log::debug;
use percent_encoding::percent_decode_str;

use crate::constants::*;
use crate::hash::hex_hmac_sha256;
use crate::time::{format_iso8601, from_timestamp, now, DateTime};
use crate::utils::uri_encode;
use crate::{Credential, Error, Result};

/// SignRequest is the trait used by the dispatcher to sign a prepared request.
///
/// Implementations must only add the authorization to the request, all other
/// parts are left untouched.
pub trait SignRequest: Debug + Send + Sync + 'static {
    /// Sign the request in place.
    ///
    /// Returns a credential error if `credential` is missing.
    fn sign_request(
        &self,
        req: &mut Parts,
        credential: Option<&Credential>,
        options: &SignOptions,
    ) -> Result<()>;
}

/// SignOptions controls how [`RequestSigner`] signs a request.
#[derive(Clone, Debug)]
pub struct SignOptions {
    headers_to_sign: HashSet<String>,
    timestamp: Option<DateTime>,
    expire_seconds: u64,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            headers_to_sign: ["host", "content-length", "content-type", CONTENT_MD5]
                .into_iter()
                .map(String::from)
                .collect(),
            timestamp: None,
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
        }
    }
}

impl SignOptions {
    /// Create sign options with default headers to sign and expire window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the headers that must be included in the signature.
    ///
    /// Names are matched case-insensitively.
    pub fn with_headers_to_sign<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers_to_sign = headers
            .into_iter()
            .map(|h| h.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Sign every request at the given time instead of now.
    pub fn with_timestamp(mut self, time: DateTime) -> Self {
        self.timestamp = Some(time);
        self
    }

    /// Sign every request at the given unix seconds, `0` means now.
    pub fn with_unix_timestamp(mut self, secs: i64) -> Result<Self> {
        self.timestamp = match secs {
            0 => None,
            secs => Some(from_timestamp(secs)?),
        };
        Ok(self)
    }

    /// Set the signature validity window in seconds.
    pub fn with_expire_seconds(mut self, expire_seconds: u64) -> Self {
        self.expire_seconds = expire_seconds;
        self
    }

    /// Lowercase names of the headers to sign.
    pub fn headers_to_sign(&self) -> &HashSet<String> {
        &self.headers_to_sign
    }

    /// Fixed signing time, `None` means now.
    pub fn timestamp(&self) -> Option<DateTime> {
        self.timestamp
    }

    /// Signature validity window in seconds.
    pub fn expire_seconds(&self) -> u64 {
        self.expire_seconds
    }
}

/// RequestSigner implements the `attains-auth-v1` protocol.
///
/// ```text
/// Authorization: attains-auth-v1/{ak}/{date}/{expire}/{signed-headers}/{signature}
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestSigner;

impl RequestSigner {
    /// Create a new signer.
    pub fn new() -> Self {
        Self
    }
}

impl SignRequest for RequestSigner {
    fn sign_request(
        &self,
        req: &mut Parts,
        credential: Option<&Credential>,
        options: &SignOptions,
    ) -> Result<()> {
        let cred = credential
            .ok_or_else(|| Error::credential_invalid("credential should not be empty for sign"))?;
        let now = options.timestamp().unwrap_or_else(now);

        // signing key info: "attains-auth-v1/{ak}/{date}/{expire}"
        let sign_key_info = format!(
            "{}/{}/{}/{}",
            ATTAINS_AUTH_VERSION,
            cred.access_key_id(),
            format_iso8601(now),
            options.expire_seconds()
        );
        debug!("calculated sign key info: {sign_key_info}");
        let sign_key = hex_hmac_sha256(
            cred.secret_access_key().as_bytes(),
            sign_key_info.as_bytes(),
        );

        let (canonical_headers, signed_headers) =
            canonical_headers(&req.headers, options.headers_to_sign());
        let creq = canonical_request_string(
            req.method.as_str(),
            &canonical_uri(req.uri.path()),
            &canonical_query(&query_pairs(req.uri.query())),
            &canonical_headers,
        )?;
        debug!("calculated canonical request: {creq:?}");

        let signature = hex_hmac_sha256(sign_key.as_bytes(), creq.as_bytes());
        let authorization = format!(
            "{}/{}/{}",
            sign_key_info,
            signed_headers.join(";"),
            signature
        );
        debug!("calculated authorization: {authorization}");

        let mut value = HeaderValue::from_str(&authorization)?;
        value.set_sensitive(true);
        req.headers.insert(AUTHORIZATION, value);

        Ok(())
    }
}

/// Join method, uri, query and headers with `\n`.
fn canonical_request_string(
    method: &str,
    uri: &str,
    query: &str,
    headers: &str,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    writeln!(f, "{method}")?;
    writeln!(f, "{uri}")?;
    writeln!(f, "{query}")?;
    write!(f, "{headers}")?;

    Ok(f)
}

/// Decode the raw query into ordered pairs, duplicates kept.
fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|v| {
            form_urlencoded::parse(v.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

/// Canonicalize the request path.
///
/// The path is decoded first so an already encoded path is not encoded twice.
pub fn canonical_uri(path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        return "/".to_string();
    }

    let decoded: Vec<u8> = percent_decode_str(path).collect();
    format!("/{}", uri_encode(decoded, false))
}

/// Canonicalize query pairs.
///
/// ```text
/// [(b, 2), (a, 1), (c, "")] => "a=1&b=2&c="
/// ```
pub fn canonical_query(query: &[(String, String)]) -> String {
    let mut pairs: Vec<String> = query
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
        .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
        .collect();
    pairs.sort();

    pairs.join("&")
}

/// Canonicalize headers that take part in signing.
///
/// Returns the newline-joined `name:value` block and the sorted, de-duplicated
/// lowercase names of the signed headers.
pub fn canonical_headers(
    headers: &HeaderMap,
    headers_to_sign: &HashSet<String>,
) -> (String, Vec<String>) {
    let mut lines = Vec::with_capacity(headers.len());
    let mut names = Vec::with_capacity(headers.len());

    for (name, value) in headers {
        // HeaderName is always lowercase.
        let name = name.as_str();
        if name == AUTHORIZATION.as_str() {
            continue;
        }
        let attains_header = name.starts_with(X_ATTAINS_PREFIX) && name != X_ATTAINS_REQUEST_ID;
        if !headers_to_sign.contains(name) && !attains_header {
            continue;
        }

        let value = String::from_utf8_lossy(value.as_bytes());
        lines.push(format!(
            "{}:{}",
            uri_encode(name, true),
            uri_encode(value.trim(), true)
        ));
        names.push(name.to_string());
    }

    lines.sort();
    names.sort();
    names.dedup();

    (lines.join("\n"), names)
}
