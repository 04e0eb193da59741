//! Infrastructure errors
//!
//! `InfraError` collects failures from the libraries the adapters sit on
//! (`reqwest`, `serde_json`, `toml`, the filesystem). The port-level error
//! types in `crmchat-core` are produced from it in [`conversions`].

pub mod conversions;

use std::path::PathBuf;

use thiserror::Error;

/// Adapter-side failure
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("HTTP request timed out")]
    Timeout,

    #[error("HTTP connection failure: {0}")]
    Connect(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InfraError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Transport-level failure worth retrying later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type InfraResult<T> = Result<T, InfraError>;
