//! Sync configuration.
//!
//! Every knob has a default; [`SyncConfig::from_env`] overrides them from
//! `CARTSYNC_*` environment variables and rejects values it cannot parse.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// What `remove` reports when the remote call failed but the local cache
/// was updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovePolicy {
    /// Report success: the local cache is what the user sees.
    #[default]
    LocalFirst,
    /// Report the remote outcome.
    Strict,
}

impl RemovePolicy {
    pub fn outcome(self, remote_ok: bool) -> bool {
        match self {
            RemovePolicy::LocalFirst => true,
            RemovePolicy::Strict => remote_ok,
        }
    }
}

impl FromStr for RemovePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local-first" | "local_first" | "localfirst" => Ok(RemovePolicy::LocalFirst),
            "strict" => Ok(RemovePolicy::Strict),
            other => Err(format!("unknown remove policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Remote API base URL (default: "http://127.0.0.1:3000/api/")
    pub api_url: String,
    /// Timeout applied to every HTTP request (default: 15s)
    pub request_timeout: Duration,
    /// Retry budget for reconciliation calls (default: 3 retries)
    pub retry: RetryPolicy,
    pub remove_policy: RemovePolicy,
    /// File backing the native key-value store (default: "cartsync-store.json")
    pub store_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3000/api/".to_string(),
            request_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            remove_policy: RemovePolicy::default(),
            store_path: PathBuf::from("cartsync-store.json"),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("CARTSYNC_API_URL") {
            config.api_url = url;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CARTSYNC_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "CARTSYNC_MAX_RETRIES")? {
            config.retry.max_attempts = retries.saturating_add(1);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CARTSYNC_RETRY_BASE_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CARTSYNC_RETRY_MAX_MS")? {
            config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(policy) = parse_var::<RemovePolicy>(&lookup, "CARTSYNC_REMOVE_POLICY")? {
            config.remove_policy = policy;
        }
        if let Some(path) = lookup("CARTSYNC_STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
