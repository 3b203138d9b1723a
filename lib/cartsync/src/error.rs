use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No auth token stored, sign in first")]
    MissingToken,

    #[error("Remote API rejected the auth token")]
    Unauthorized,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Remote API reported failure: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Not configured: {0}")]
    NotConfigured(&'static str),
}

impl SyncError {
    /// Errors that abort an operation instead of degrading to the local cache.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::MissingToken)
    }

    /// Transient failures worth another attempt: transport problems,
    /// 5xx responses and rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Http(e) => e.is_timeout() || is_connect(e) || e.is_request(),
            SyncError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn is_connect(e: &reqwest::Error) -> bool {
    e.is_connect()
}

// The browser fetch client does not classify connection failures.
#[cfg(target_arch = "wasm32")]
fn is_connect(_e: &reqwest::Error) -> bool {
    false
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage is unavailable")]
    Unavailable,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("Scanned code is empty")]
    Empty,

    #[error("Scanned code does not point to a product: {0}")]
    NotAProduct(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}
