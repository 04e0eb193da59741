//! OIDC wire types
//!
//! Token endpoint responses and errors (RFC 6749 §5), the discovery document,
//! and the pending sign-in record kept between redirect and callback.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use crmchat_domain::VendorUser;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::pkce::PkceChallenge;

/// Successful token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub session_state: Option<String>,
}

impl TokenResponse {
    /// Build the vendor user
    ///
    /// `expires_at` is computed here, once, from `now` and `expires_in`.
    /// Values the provider omits on renewal fall back to `previous`.
    pub fn into_user(self, now: i64, previous: Option<&VendorUser>) -> VendorUser {
        let id_token = self.id_token.or_else(|| previous.and_then(|p| p.id_token.clone()));
        let profile = id_token
            .as_deref()
            .and_then(decode_id_token_claims)
            .or_else(|| previous.map(|p| p.profile.clone()))
            .unwrap_or(Value::Null);

        VendorUser {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            id_token,
            token_type: self.token_type,
            expires_at: self.expires_in.map(|secs| now.saturating_add(secs)),
            scope: self.scope.or_else(|| previous.and_then(|p| p.scope.clone())),
            session_state: self
                .session_state
                .or_else(|| previous.and_then(|p| p.session_state.clone())),
            profile,
        }
    }
}

/// OAuth error body (RFC 6749 §5.2)
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Subset of `/.well-known/openid-configuration`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

/// Endpoints the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorization: String,
    pub token: String,
    pub end_session: Option<String>,
}

/// Sign-in started by `signin_redirect`, awaiting its callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSignin {
    pub pkce: PkceChallenge,
    /// Opaque application state passed to `signin_redirect`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub created_at: i64,
}

/// Decode the payload of a JWT without verifying it
///
/// The claims only feed display data (`sub`, `email`, ...). Signature
/// checking belongs to whoever consumes the token.
pub fn decode_id_token_claims(id_token: &str) -> Option<Value> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
