use std::time::Duration;

// Headers used in attains signing and dispatch.
pub const X_ATTAINS_PREFIX: &str = "x-attains-";
pub const X_ATTAINS_DATE: &str = "x-attains-date";
pub const X_ATTAINS_REQUEST_ID: &str = "x-attains-request-id";
pub const CONTENT_MD5: &str = "content-md5";

// Signing.
pub const ATTAINS_AUTH_VERSION: &str = "attains-auth-v1";
pub const DEFAULT_EXPIRE_SECONDS: u64 = 1800;

// Dispatch.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json;charset=utf-8";
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(1200);
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `code` of a successful response wrapper.
pub const CODE_OK: i64 = 200;
/// `code` sent by the service when the signature window has passed.
pub const CODE_REQUEST_EXPIRED: i64 = -2;

// Retry defaults of the stock client.
pub const DEFAULT_MAX_RETRY: u32 = 3;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(20_000);
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_millis(300);
