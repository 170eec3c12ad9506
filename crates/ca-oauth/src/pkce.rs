//! PKCE (Proof Key for Code Exchange) utilities for OAuth 2.0
//!
//! Implements PKCE as defined in RFC 7636 with the S256 (SHA-256) challenge
//! method.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{thread_rng, RngCore};
use sha2::{Digest, Sha256};

/// Challenge method sent in the authorization URL. Always S256.
pub const CHALLENGE_METHOD: &str = "S256";

/// PKCE verifier/challenge pair for one authorization attempt
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Code verifier sent with the token request
    pub code_verifier: String,

    /// Code challenge (BASE64URL(SHA256(code_verifier))) sent in the
    /// authorization URL
    pub code_challenge: String,
}

impl PkcePair {
    /// Generate a fresh verifier and its derived challenge.
    ///
    /// The verifier is 32 bytes from a cryptographically secure RNG,
    /// base64url-encoded without padding (43 characters). RFC 7636 requires
    /// 256 bits of entropy for the S256 method.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        thread_rng().fill_bytes(&mut bytes);
        let code_verifier = URL_SAFE_NO_PAD.encode(bytes);
        let code_challenge = derive_challenge(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
        }
    }
}

/// Derive the S256 code challenge for a verifier.
///
/// Pure function: the same verifier always yields the same challenge.
pub fn derive_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
