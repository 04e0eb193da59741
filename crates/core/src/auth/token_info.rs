//! Token record extraction

use crmchat_domain::constants::DEFAULT_TOKEN_TYPE;
use crmchat_domain::{TokenInfo, VendorUser};

/// Derive a [`TokenInfo`] from a vendor user
///
/// Returns `None` when the user carries no access token. Missing fields fall
/// back to `token_type = "Bearer"`, `expires_at = 0` and an empty scope list.
pub fn extract_token_info(user: &VendorUser) -> Option<TokenInfo> {
    if user.access_token.is_empty() {
        return None;
    }

    Some(TokenInfo {
        access_token: user.access_token.clone(),
        refresh_token: user.refresh_token.clone(),
        id_token: user.id_token.clone(),
        token_type: user
            .token_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        expires_at: user.expires_at.unwrap_or(0),
        scopes: user
            .scope
            .as_deref()
            .map(|scope| scope.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    })
}
