//! OIDC identity provider adapter

pub mod client;
pub mod pkce;
pub mod types;

pub use client::{HttpIdentityClient, EXPIRING_NOTIFICATION_SECS, PENDING_SIGNIN_KEY, USER_STORE_PREFIX};
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, validate_state, PkceChallenge,
};
pub use types::{DiscoveryDocument, OAuthErrorBody, PendingSignin, ProviderEndpoints, TokenResponse};
