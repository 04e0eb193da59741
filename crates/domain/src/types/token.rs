//! Normalized token record
//!
//! All timestamps are Unix seconds. Callers pass `now` from a
//! `crmchat_common::time::Clock` so freshness checks stay deterministic in
//! tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token record derived from a [`VendorUser`](crate::types::VendorUser)
///
/// Persisted inside the `"oidc-storage"` blob with camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    pub token_type: String,
    /// Unix seconds; `0` when the provider gave no expiry
    pub expires_at: i64,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl TokenInfo {
    /// `now >= expires_at`
    ///
    /// A token without a known expiry (`expires_at == 0`) counts as expired.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Whether the token expires within `leeway_secs`, expired tokens included
    #[must_use]
    pub fn expires_within(&self, now: i64, leeway_secs: i64) -> bool {
        self.seconds_until_expiry(now) <= leeway_secs
    }

    /// Negative once expired
    #[must_use]
    pub fn seconds_until_expiry(&self, now: i64) -> i64 {
        self.expires_at.saturating_sub(now)
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Value for an `Authorization` header, e.g. `Bearer abc`
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// `expires_at` as a UTC timestamp, `None` when unknown
    #[must_use]
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        if self.expires_at <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.expires_at, 0)
    }
}
