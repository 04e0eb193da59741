//! Persisted session blob and callback status

use std::fmt;

use serde::{Deserialize, Serialize};

use super::token::TokenInfo;
use super::user::{UserInfo, VendorUser};

/// Durable subset of the session, stored under `"oidc-storage"`
///
/// Wire format:
/// `{ "user", "userInfo", "tokenInfo", "isAuthenticated", "lastRefreshTime" }`
/// with `lastRefreshTime` in Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub user: Option<VendorUser>,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
    #[serde(default)]
    pub token_info: Option<TokenInfo>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub last_refresh_time: Option<i64>,
}

impl PersistedSession {
    /// Authenticated blobs must carry both the user and its token record
    pub fn is_consistent(&self) -> bool {
        self.is_authenticated == (self.user.is_some() && self.token_info.is_some())
    }
}

/// Progress of the login-completion handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum CallbackStatus {
    Processing,
    Success,
    Error(String),
}

impl CallbackStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl fmt::Display for CallbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Success => write!(f, "success"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}
