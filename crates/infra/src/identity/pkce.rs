//! PKCE (Proof Key for Code Exchange) for the authorization code flow
//!
//! RFC 7636 with the S256 method. The client is public, so the verifier is
//! the only proof that the party redeeming the code started the login.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Generate a code verifier
///
/// 32 random bytes, base64url without padding (43 characters, inside the
/// 43-128 range RFC 7636 allows).
pub fn generate_code_verifier() -> String {
    random_token()
}

/// BASE64URL(SHA256(ASCII(code_verifier)))
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Random CSRF state token
pub fn generate_state() -> String {
    random_token()
}

/// Compare the state sent with the one received
pub fn validate_state(expected: &str, actual: &str) -> bool {
    expected == actual
}

fn random_token() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// PKCE pair plus state for one authorization request
///
/// Serializable so a pending sign-in survives between the `login` and
/// `callback` steps when they run in different processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    /// Kept secret until the token exchange
    pub code_verifier: String,
    /// Sent in the authorization request
    pub code_challenge: String,
    /// Must match between request and callback
    pub state: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: generate_state() }
    }

    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}
