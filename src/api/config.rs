//! Client configuration parsed from environment variables.

use std::time::Duration;

use super::types::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RECOMPUTE_DEBOUNCE_MS: u64 = 400;
pub const DEFAULT_PRIMARY_AGENT: &str = "conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without a trailing slash.
    pub base_url: String,
    pub timeouts: ClientTimeouts,
    /// Quiescence window before an edit-triggered nutrition recompute fires.
    pub recompute_debounce: Duration,
    /// History turns from assistants other than this agent are hidden.
    pub primary_agent: String,
    /// Raw `Cookie` header carrying the backend login session, if any.
    pub session_cookie: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: ClientTimeouts::default(),
            recompute_debounce: Duration::from_millis(DEFAULT_RECOMPUTE_DEBOUNCE_MS),
            primary_agent: DEFAULT_PRIMARY_AGENT.to_string(),
            session_cookie: None,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `NUTRICHAT_BASE_URL`: default `http://127.0.0.1:5001`
    /// - `NUTRICHAT_REQUEST_TIMEOUT_SECS`: default 120
    /// - `NUTRICHAT_CONNECT_TIMEOUT_SECS`: default 10
    /// - `NUTRICHAT_RECOMPUTE_DEBOUNCE_MS`: default 400
    /// - `NUTRICHAT_PRIMARY_AGENT`: default `conversation`
    /// - `NUTRICHAT_SESSION_COOKIE`: sent as the `Cookie` header when set
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ConfigParse`] if the base URL is not http(s).
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = normalize_base_url(
            &std::env::var("NUTRICHAT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        )?;
        let timeouts = ClientTimeouts {
            request_secs: env_parse("NUTRICHAT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("NUTRICHAT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let recompute_debounce =
            Duration::from_millis(env_parse("NUTRICHAT_RECOMPUTE_DEBOUNCE_MS", DEFAULT_RECOMPUTE_DEBOUNCE_MS));
        let primary_agent = std::env::var("NUTRICHAT_PRIMARY_AGENT")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PRIMARY_AGENT.to_string());

        let session_cookie = std::env::var("NUTRICHAT_SESSION_COOKIE")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self { base_url, timeouts, recompute_debounce, primary_agent, session_cookie })
    }
}

/// Validate an http(s) origin and strip trailing slashes.
///
/// # Errors
///
/// Returns [`ApiError::ConfigParse`] for any other scheme or an empty host.
pub fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| ApiError::ConfigParse(format!("base URL must start with http:// or https://: {raw}")))?;
    if host.is_empty() {
        return Err(ApiError::ConfigParse(format!("base URL has no host: {raw}")));
    }
    Ok(trimmed.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
