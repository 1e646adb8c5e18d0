//! Core identity types and the session store contract.
//!
//! Everything that has to survive between the authorization redirect, the
//! provider callback and later "who is logged in" queries goes through a
//! [`SessionIdentityStore`]. The store is owned by one user session and is
//! never shared across sessions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Ephemeral security material for a single login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationChallenge {
    pub state: String,
    pub nonce: String,
    pub code_verifier: String,
}

/// Normalized identity of an authenticated user.
///
/// `subject` and `display_name` are always present, empty when the provider
/// omitted them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_verified: bool,
}

impl UserIdentity {
    /// Serialize for storage in a session record.
    pub fn to_session_value(&self) -> IdentityResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a stored identity. A corrupted record reads as "not logged in".
    pub fn from_session_value(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Discarding unreadable identity from session: {}", e);
                None
            }
        }
    }
}

/// Typed view over one session's storage.
#[async_trait]
pub trait SessionIdentityStore: Send + Sync {
    async fn get_challenge(&self) -> IdentityResult<Option<AuthorizationChallenge>>;

    async fn put_challenge(&self, challenge: AuthorizationChallenge) -> IdentityResult<()>;

    async fn clear_challenge(&self) -> IdentityResult<()>;

    /// Read and remove the stored challenge.
    ///
    /// Stores that can do this atomically should override the default.
    async fn take_challenge(&self) -> IdentityResult<Option<AuthorizationChallenge>> {
        let challenge = self.get_challenge().await?;
        self.clear_challenge().await?;
        Ok(challenge)
    }

    async fn get_identity(&self) -> IdentityResult<Option<UserIdentity>>;

    async fn put_identity(&self, identity: &UserIdentity) -> IdentityResult<()>;

    async fn get_access_token(&self) -> IdentityResult<Option<String>>;

    async fn put_access_token(&self, access_token: &str) -> IdentityResult<()>;

    /// Drop the whole record: challenge, identity and anything else stored.
    async fn clear_all(&self) -> IdentityResult<()>;
}
