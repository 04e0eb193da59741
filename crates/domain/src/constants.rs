//! Application constants
//!
//! Storage keys and timing defaults shared by the session store, the callback
//! flow and the adapters.

// Storage keys
pub const DURABLE_STORAGE_KEY: &str = "oidc-storage";
pub const RETURN_URL_KEY: &str = "oidc_return_url";

// Refresh happens this many seconds before `expires_at`
pub const REFRESH_LEEWAY_SECS: i64 = 300;

/// Substring the identity provider uses when only an interactive login can
/// recover the session.
pub const LOGIN_REQUIRED_SENTINEL: &str = "login_required";

// Token defaults
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
pub const DEFAULT_SCOPES: &str = "openid profile email offline_access";

// Callback routing
pub const DEFAULT_RETURN_URL: &str = "/";
pub const CALLBACK_SUCCESS_REDIRECT_DELAY_MS: u64 = 1000;
pub const CALLBACK_ERROR_REDIRECT_DELAY_MS: u64 = 3000;

// Durable store location
pub const DEFAULT_STATE_DIR: &str = ".crmchat";
