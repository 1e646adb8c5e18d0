//! PKCE (RFC 7636) verifier/challenge generation and random tokens.

use crate::error::{OidcError, OidcResult};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

pub const CODE_CHALLENGE_METHOD: &str = "S256";

const VERIFIER_BYTES: usize = 32;

/// PKCE code challenge and verifier
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
}

impl PkceChallenge {
    /// Generate a new PKCE pair from the OS random source.
    pub fn generate() -> OidcResult<Self> {
        let code_verifier = generate_verifier()?;
        Ok(Self::from_verifier(code_verifier))
    }

    pub fn from_verifier(code_verifier: String) -> Self {
        let code_challenge = derive_challenge(&code_verifier);
        Self {
            code_verifier,
            code_challenge,
            code_challenge_method: CODE_CHALLENGE_METHOD.to_string(),
        }
    }
}

fn fill_random(bytes: &mut [u8]) -> OidcResult<()> {
    OsRng
        .try_fill_bytes(bytes)
        .map_err(|e| OidcError::RandomSourceFailure(e.to_string()))
}

/// 32 random bytes, URL-safe base64 without padding (43 characters).
pub fn generate_verifier() -> OidcResult<String> {
    let mut bytes = [0u8; VERIFIER_BYTES];
    fill_random(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// S256 challenge: base64url(sha256(verifier)).
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Random UUID v4 string for `state` and `nonce`.
pub fn random_token() -> OidcResult<String> {
    let mut bytes = [0u8; 16];
    fill_random(&mut bytes)?;
    Ok(uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string())
}
