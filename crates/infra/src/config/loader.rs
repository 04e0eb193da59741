//! Configuration loader
//!
//! Loads the CrmChat configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the OIDC registration is incomplete there, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `CRMCHAT_OIDC_AUTHORITY`: Issuer base URL
//! - `CRMCHAT_OIDC_CLIENT_ID`: Client identifier
//! - `CRMCHAT_OIDC_REDIRECT_URI`: Callback URL registered with the provider
//!
//! Optional:
//! - `CRMCHAT_OIDC_CLIENT_SECRET`, `CRMCHAT_OIDC_POST_LOGOUT_REDIRECT_URI`,
//!   `CRMCHAT_OIDC_SCOPES`
//! - `CRMCHAT_OIDC_AUTHORIZATION_ENDPOINT`, `CRMCHAT_OIDC_TOKEN_ENDPOINT`,
//!   `CRMCHAT_OIDC_END_SESSION_ENDPOINT` (otherwise discovered)
//! - `CRMCHAT_PROFILE_ENDPOINT`: Backend user-info URL
//! - `CRMCHAT_REFRESH_LEEWAY_SECS`: Seconds before expiry to refresh
//! - `CRMCHAT_STATE_DIR`: Directory for the durable store
//! - `CRMCHAT_LOG_LEVEL`, `CRMCHAT_LOG_FORMAT` (`pretty` or `json`)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./crmchat.toml`, `./crmchat.json`, `./config.toml`, `./config.json`
//! 2. The same names in `..` and `../..`
//! 3. The same names next to the executable and its parents

use std::path::{Path, PathBuf};

use crmchat_domain::{
    Config, LogFormat, LoggingConfig, OidcConfig, Result, SessionConfig, SessionError,
    StorageConfig,
};

const CONFIG_FILE_NAMES: [&str; 4] = ["crmchat.toml", "crmchat.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `SessionError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `SessionError::Config` if a required variable is missing or a
/// numeric/enum value cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    let oidc = OidcConfig {
        authority: env_var("CRMCHAT_OIDC_AUTHORITY")?,
        client_id: env_var("CRMCHAT_OIDC_CLIENT_ID")?,
        redirect_uri: env_var("CRMCHAT_OIDC_REDIRECT_URI")?,
        client_secret: env_opt("CRMCHAT_OIDC_CLIENT_SECRET"),
        post_logout_redirect_uri: env_opt("CRMCHAT_OIDC_POST_LOGOUT_REDIRECT_URI"),
        scopes: env_opt("CRMCHAT_OIDC_SCOPES").unwrap_or_else(|| OidcConfig::default().scopes),
        authorization_endpoint: env_opt("CRMCHAT_OIDC_AUTHORIZATION_ENDPOINT"),
        token_endpoint: env_opt("CRMCHAT_OIDC_TOKEN_ENDPOINT"),
        end_session_endpoint: env_opt("CRMCHAT_OIDC_END_SESSION_ENDPOINT"),
        profile_endpoint: env_opt("CRMCHAT_PROFILE_ENDPOINT"),
    };

    let mut session = SessionConfig::default();
    if let Some(leeway) = env_opt("CRMCHAT_REFRESH_LEEWAY_SECS") {
        session.refresh_leeway_secs = leeway
            .parse::<i64>()
            .map_err(|e| SessionError::Config(format!("Invalid refresh leeway: {e}")))?;
    }

    let storage = env_opt("CRMCHAT_STATE_DIR")
        .map_or_else(StorageConfig::default, |dir| StorageConfig { state_dir: PathBuf::from(dir) });

    let mut logging = LoggingConfig::default();
    if let Some(level) = env_opt("CRMCHAT_LOG_LEVEL") {
        logging.level = level;
    }
    if let Some(format) = env_opt("CRMCHAT_LOG_FORMAT") {
        logging.format = parse_log_format(&format)?;
    }

    Ok(Config { oidc, session, storage, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SessionError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SessionError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SessionError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SessionError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `SessionError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SessionError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SessionError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SessionError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Returns the first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut bases = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        bases.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            bases.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    bases
        .iter()
        .flat_map(|base| CONFIG_FILE_NAMES.iter().map(move |name| base.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `SessionError::Config` if the variable is unset or blank.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        SessionError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional environment variable; blank counts as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "pretty" | "text" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(SessionError::Config(format!("Invalid log format: {other}"))),
    }
}
