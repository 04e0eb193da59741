//! Conversions from external infrastructure errors into port errors.

use crmchat_core::{IdentityError, ProfileError, StorageError};
use crmchat_domain::SessionError;
use reqwest::Error as HttpError;

use super::InfraError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → InfraError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        #[cfg(not(target_arch = "wasm32"))]
        if err.is_connect() {
            return Self::Connect(err.to_string());
        }

        if let Some(status) = err.status() {
            return Self::Status {
                status: status.as_u16(),
                body: status.canonical_reason().unwrap_or("unknown status").to_string(),
            };
        }

        if err.is_decode() {
            return Self::Http(format!("invalid response body: {err}"));
        }

        Self::Http(err.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* InfraError → port errors */
/* -------------------------------------------------------------------------- */

impl From<InfraError> for IdentityError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Timeout | InfraError::Connect(_) | InfraError::Http(_) => {
                Self::Transport(err.to_string())
            }
            InfraError::Config(msg) => Self::NotConfigured(msg),
            other => Self::InvalidResponse(other.to_string()),
        }
    }
}

impl From<InfraError> for ProfileError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Status { status, body } => Self::Status { status, body },
            InfraError::Json(e) => Self::Decode(e.to_string()),
            InfraError::Config(_) => Self::NotConfigured,
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<InfraError> for StorageError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Io { path, source } => {
                Self::Io { key: path.display().to_string(), message: source.to_string() }
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

impl From<InfraError> for SessionError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Config(msg) => Self::Config(msg),
            InfraError::Toml(e) => Self::Config(format!("Invalid TOML format: {e}")),
            InfraError::Json(e) => Self::Config(format!("Invalid JSON format: {e}")),
            InfraError::Io { .. } => Self::Storage(err.to_string()),
            other => Self::Initialization(other.to_string()),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
