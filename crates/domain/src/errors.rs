//! Error types used throughout the session layer

use std::time::Duration;

use crmchat_common::error::{ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::LOGIN_REQUIRED_SENTINEL;

/// Session lifecycle errors
///
/// This is what lands in the store's `error` slot; store operations never
/// propagate vendor failures any other way.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SessionError {
    /// Identity client missing or misconfigured
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Login error: {0}")]
    Login(String),

    #[error("Logout error: {0}")]
    Logout(String),

    /// Recoverable refresh failure; stale state stays in place
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// The provider needs a fresh interactive login
    #[error("Login required: {0}")]
    LoginRequired(String),

    #[error("Callback error: {0}")]
    Callback(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Classify a silent-renewal failure message
    ///
    /// Messages containing `login_required` become [`SessionError::LoginRequired`],
    /// everything else is a recoverable [`SessionError::Refresh`].
    pub fn refresh_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(LOGIN_REQUIRED_SENTINEL) {
            Self::LoginRequired(message)
        } else {
            Self::Refresh(message)
        }
    }

    /// Whether the session must be torn down and the user sent back to login
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::LoginRequired(_))
    }
}

impl ErrorClassification for SessionError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Refresh(_) | Self::Profile(_) | Self::Login(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Initialization(_) | Self::Config(_) => ErrorSeverity::Critical,
            Self::Callback(_) | Self::Storage(_) | Self::Login(_) | Self::Logout(_) => {
                ErrorSeverity::Error
            }
            Self::Refresh(_) | Self::LoginRequired(_) | Self::Profile(_) => ErrorSeverity::Warning,
            Self::NotAuthenticated => ErrorSeverity::Info,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Initialization(_) | Self::Config(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for errors.
    use super::*;

    /// Validates `SessionError::refresh_failure` behavior for the sentinel
    /// classification scenario.
    ///
    /// Assertions:
    /// - Confirms messages containing `login_required` map to `LoginRequired`.
    /// - Confirms other messages map to `Refresh`.
    #[test]
    fn test_refresh_failure_classification() {
        let err = SessionError::refresh_failure("invalid_grant: login_required");
        assert!(err.requires_login());
        assert!(!err.is_retryable());

        let err = SessionError::refresh_failure("network unreachable");
        assert_eq!(err, SessionError::Refresh("network unreachable".into()));
        assert!(err.is_retryable());
        assert!(!err.requires_login());
    }

    /// Validates the severity ladder for the session taxonomy.
    ///
    /// Assertions:
    /// - Confirms initialization failures are critical.
    /// - Confirms login-required is a warning.
    #[test]
    fn test_severity_mapping() {
        assert!(SessionError::Initialization("no client".into()).is_critical());
        assert_eq!(SessionError::LoginRequired("x".into()).severity(), ErrorSeverity::Warning);
        assert_eq!(SessionError::NotAuthenticated.severity(), ErrorSeverity::Info);
    }

    /// Validates the tagged serde representation scenario.
    ///
    /// Assertions:
    /// - Confirms the JSON carries `type` and `message`.
    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(SessionError::Callback("state mismatch".into())).unwrap();
        assert_eq!(json["type"], "Callback");
        assert_eq!(json["message"], "state mismatch");
    }
}
