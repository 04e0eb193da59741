//! Configuration structures
//!
//! Loaded by `crmchat-infra` (environment first, then a TOML/JSON file) and
//! handed to the adapters and the session store.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    CALLBACK_ERROR_REDIRECT_DELAY_MS, CALLBACK_SUCCESS_REDIRECT_DELAY_MS, DEFAULT_RETURN_URL,
    DEFAULT_SCOPES, DEFAULT_STATE_DIR, REFRESH_LEEWAY_SECS,
};
use crate::errors::{Result, SessionError};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub oidc: OidcConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity provider registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Issuer base URL
    #[serde(default)]
    pub authority: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_uri: Option<String>,
    /// Space-separated scopes
    #[serde(default = "default_scopes")]
    pub scopes: String,

    // Discovered from `<authority>/.well-known/openid-configuration` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,

    /// Backend extended user-info endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_endpoint: Option<String>,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            authority: String::new(),
            client_id: String::new(),
            client_secret: None,
            redirect_uri: String::new(),
            post_logout_redirect_uri: None,
            scopes: default_scopes(),
            authorization_endpoint: None,
            token_endpoint: None,
            end_session_endpoint: None,
            profile_endpoint: None,
        }
    }
}

impl OidcConfig {
    /// Reject registrations the identity client cannot work with
    ///
    /// # Errors
    /// Returns [`SessionError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(SessionError::Config("oidc.client_id must not be empty".into()));
        }
        parse_url("oidc.authority", &self.authority)?;
        parse_url("oidc.redirect_uri", &self.redirect_uri)?;

        let optional = [
            ("oidc.post_logout_redirect_uri", &self.post_logout_redirect_uri),
            ("oidc.authorization_endpoint", &self.authorization_endpoint),
            ("oidc.token_endpoint", &self.token_endpoint),
            ("oidc.end_session_endpoint", &self.end_session_endpoint),
            ("oidc.profile_endpoint", &self.profile_endpoint),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                parse_url(field, value)?;
            }
        }
        Ok(())
    }

    /// Scopes as a list
    pub fn scope_list(&self) -> Vec<String> {
        self.scopes.split_whitespace().map(str::to_string).collect()
    }

    /// Issuer URL without a trailing slash
    pub fn issuer(&self) -> &str {
        self.authority.trim_end_matches('/')
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| SessionError::Config(format!("{field} is not a valid URL: {e}")))
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

/// Session timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_refresh_leeway")]
    pub refresh_leeway_secs: i64,
    #[serde(default = "default_success_delay")]
    pub success_redirect_delay_ms: u64,
    #[serde(default = "default_error_delay")]
    pub error_redirect_delay_ms: u64,
    #[serde(default = "default_return_url")]
    pub default_return_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_leeway_secs: REFRESH_LEEWAY_SECS,
            success_redirect_delay_ms: CALLBACK_SUCCESS_REDIRECT_DELAY_MS,
            error_redirect_delay_ms: CALLBACK_ERROR_REDIRECT_DELAY_MS,
            default_return_url: DEFAULT_RETURN_URL.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn success_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.success_redirect_delay_ms)
    }

    pub fn error_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.error_redirect_delay_ms)
    }
}

fn default_refresh_leeway() -> i64 {
    REFRESH_LEEWAY_SECS
}

fn default_success_delay() -> u64 {
    CALLBACK_SUCCESS_REDIRECT_DELAY_MS
}

fn default_error_delay() -> u64 {
    CALLBACK_ERROR_REDIRECT_DELAY_MS
}

fn default_return_url() -> String {
    DEFAULT_RETURN_URL.to_string()
}

/// Durable storage location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { state_dir: default_state_dir() }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: LogFormat::default() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
