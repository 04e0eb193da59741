//! Port interfaces for the session layer
//!
//! These traits define the boundaries between the session logic and the
//! adapters in `crmchat-infra` (HTTP identity provider, backend profile
//! endpoint, durable and session-scoped storage, navigation).

use std::time::Duration;

use async_trait::async_trait;
use crmchat_common::error::{ErrorClassification, ErrorSeverity};
use crmchat_domain::constants::LOGIN_REQUIRED_SENTINEL;
use crmchat_domain::{UserInfo, VendorUser};
use thiserror::Error;
use tokio::sync::broadcast;

/// Identity client failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// No usable registration (authority, client id, endpoints)
    #[error("Identity client not configured: {0}")]
    NotConfigured(String),

    /// OAuth error body returned by the provider (RFC 6749 §5.2)
    #[error("{}", format_provider_error(.code, .description.as_deref()))]
    Provider { code: String, description: Option<String> },

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("State mismatch in authorization response")]
    StateMismatch,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),

    /// The client's own user or sign-in record could not be read or written
    #[error("Identity client storage error: {0}")]
    Storage(String),
}

fn format_provider_error(code: &str, description: Option<&str>) -> String {
    match description {
        Some(desc) => format!("{code}: {desc}"),
        None => code.to_string(),
    }
}

impl IdentityError {
    pub fn provider(code: impl Into<String>, description: Option<String>) -> Self {
        Self::Provider { code: code.into(), description }
    }

    /// Only an interactive login can recover from this
    pub fn requires_login(&self) -> bool {
        match self {
            Self::Provider { code, description } => {
                code == LOGIN_REQUIRED_SENTINEL
                    || description.as_deref().is_some_and(|d| d.contains(LOGIN_REQUIRED_SENTINEL))
            }
            _ => false,
        }
    }
}

impl ErrorClassification for IdentityError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Provider { code, .. } => {
                !self.requires_login() && code != "invalid_grant" && code != "invalid_client"
            }
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotConfigured(_) => ErrorSeverity::Critical,
            Self::Transport(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Backend profile endpoint failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("Profile endpoint not configured")]
    NotConfigured,

    #[error("Profile endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid profile payload: {0}")]
    Decode(String),
}

/// Key/value storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed for '{key}': {message}")]
    Io { key: String, message: String },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Events emitted by the identity client
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityEvent {
    UserLoaded(VendorUser),
    UserUnloaded,
    AccessTokenExpiring,
    AccessTokenExpired,
    SilentRenewError(String),
    UserSignedOut,
}

impl IdentityEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserLoaded(_) => "user_loaded",
            Self::UserUnloaded => "user_unloaded",
            Self::AccessTokenExpiring => "access_token_expiring",
            Self::AccessTokenExpired => "access_token_expired",
            Self::SilentRenewError(_) => "silent_renew_error",
            Self::UserSignedOut => "user_signed_out",
        }
    }
}

/// OIDC relying-party client
///
/// The session layer never speaks the protocol itself; it delegates every
/// redirect, code exchange and renewal to this port.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Build the authorization request and return the URL to send the user to
    ///
    /// `state` is opaque application data echoed back on the callback.
    async fn signin_redirect(&self, state: Option<&str>) -> Result<String, IdentityError>;

    /// Complete the redirect handshake from the full callback URL
    async fn signin_redirect_callback(&self, callback_url: &str)
        -> Result<VendorUser, IdentityError>;

    /// Renew tokens without user interaction
    ///
    /// `Ok(None)` means the provider answered but produced no user.
    async fn signin_silent(&self, refresh_token: &str)
        -> Result<Option<VendorUser>, IdentityError>;

    /// Build the end-session URL
    async fn signout_redirect(&self, id_token_hint: Option<&str>)
        -> Result<String, IdentityError>;

    /// User currently held by the client, if any
    async fn get_user(&self) -> Result<Option<VendorUser>, IdentityError>;

    /// Forget the current user
    async fn remove_user(&self) -> Result<(), IdentityError>;

    /// Subscribe to the client's event stream
    fn subscribe(&self) -> broadcast::Receiver<IdentityEvent>;
}

/// Backend extended user-info endpoint
#[async_trait]
pub trait ProfileClient: Send + Sync {
    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, ProfileError>;
}

/// String key/value storage, durable or session-scoped
///
/// Synchronous: `set_user` and `clear_state` write through it without
/// suspending.
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Post-login routing
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display_carries_code() {
        let err = IdentityError::provider("login_required", Some("session expired".into()));
        assert_eq!(err.to_string(), "login_required: session expired");
        assert!(err.requires_login());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_sentinel_in_description() {
        let err = IdentityError::provider("invalid_grant", Some("login_required".into()));
        assert!(err.requires_login());

        let err = IdentityError::provider("temporarily_unavailable", None);
        assert!(!err.requires_login());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let err = IdentityError::Transport("connection reset".into());
        assert!(err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert!(IdentityError::NotConfigured("no authority".into()).is_critical());
    }
}
