//! In-memory session table.
//!
//! [`InMemorySessions`] is shared process-wide; each request works through a
//! [`SessionHandle`] bound to one session id, which implements
//! [`SessionIdentityStore`] for that session only.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sso_identity_core::{
    AuthorizationChallenge, IdentityResult, SessionIdentityStore, UserIdentity,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Raw contents of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub oauth_state: Option<String>,
    pub oauth_nonce: Option<String>,
    pub code_verifier: Option<String>,
    /// Serialized [`UserIdentity`].
    pub user: Option<String>,
    pub token: Option<String>,
}

impl SessionRecord {
    fn challenge(&self) -> Option<AuthorizationChallenge> {
        match (&self.oauth_state, &self.oauth_nonce, &self.code_verifier) {
            (Some(state), Some(nonce), Some(code_verifier)) => Some(AuthorizationChallenge {
                state: state.clone(),
                nonce: nonce.clone(),
                code_verifier: code_verifier.clone(),
            }),
            _ => None,
        }
    }

    fn clear_challenge(&mut self) {
        self.oauth_state = None;
        self.oauth_nonce = None;
        self.code_verifier = None;
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    record: SessionRecord,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn new(ttl: Duration) -> Self {
        Self {
            record: SessionRecord::default(),
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(2),
        }
    }
}

type SessionTable = Arc<RwLock<HashMap<String, SessionEntry>>>;

/// Process-wide table of sessions keyed by session id.
#[derive(Clone)]
pub struct InMemorySessions {
    entries: SessionTable,
    config: SessionConfig,
}

impl InMemorySessions {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// A fresh, unguessable session id.
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Store view for a single session. The record is created lazily on first write.
    pub fn handle(&self, session_id: impl Into<String>) -> SessionHandle {
        SessionHandle {
            session_id: session_id.into(),
            entries: self.entries.clone(),
            ttl: self.config.ttl,
        }
    }

    /// Snapshot of a live session record.
    pub async fn record(&self, session_id: &str) -> Option<SessionRecord> {
        let entries = self.entries.read().await;
        entries
            .get(session_id)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.record.clone())
    }

    /// Overwrite a session record, keeping its expiry if the session is live.
    pub async fn replace_record(&self, session_id: &str, record: SessionRecord) {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry::new(self.config.ttl));
        if entry.is_expired() {
            *entry = SessionEntry::new(self.config.ttl);
        }
        entry.record = record;
    }

    pub async fn active_sessions(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|entry| !entry.is_expired()).count()
    }

    /// Remove expired sessions, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Removed {} expired sessions", removed);
        }
        removed
    }
}

impl Default for InMemorySessions {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// [`SessionIdentityStore`] for one session of an [`InMemorySessions`] table.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    entries: SessionTable,
    ttl: Duration,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn read<T>(&self, f: impl FnOnce(&SessionRecord) -> Option<T>) -> Option<T> {
        let entries = self.entries.read().await;
        entries
            .get(&self.session_id)
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| f(&entry.record))
    }

    async fn write<T>(&self, f: impl FnOnce(&mut SessionRecord) -> T) -> T {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(self.session_id.clone())
            .or_insert_with(|| SessionEntry::new(self.ttl));
        if entry.is_expired() {
            *entry = SessionEntry::new(self.ttl);
        }
        f(&mut entry.record)
    }

    /// Mutate the record only if the session is live; never creates one.
    async fn update<T>(&self, f: impl FnOnce(&mut SessionRecord) -> Option<T>) -> Option<T> {
        let mut entries = self.entries.write().await;
        entries
            .get_mut(&self.session_id)
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| f(&mut entry.record))
    }
}

#[async_trait]
impl SessionIdentityStore for SessionHandle {
    async fn get_challenge(&self) -> IdentityResult<Option<AuthorizationChallenge>> {
        Ok(self.read(SessionRecord::challenge).await)
    }

    async fn put_challenge(&self, challenge: AuthorizationChallenge) -> IdentityResult<()> {
        self.write(|record| {
            record.oauth_state = Some(challenge.state);
            record.oauth_nonce = Some(challenge.nonce);
            record.code_verifier = Some(challenge.code_verifier);
        })
        .await;
        Ok(())
    }

    async fn clear_challenge(&self) -> IdentityResult<()> {
        self.update(|record| {
            record.clear_challenge();
            Some(())
        })
        .await;
        Ok(())
    }

    async fn take_challenge(&self) -> IdentityResult<Option<AuthorizationChallenge>> {
        // Single write lock so two racing callbacks cannot both see the challenge.
        Ok(self
            .update(|record| {
                let challenge = record.challenge();
                record.clear_challenge();
                challenge
            })
            .await)
    }

    async fn get_identity(&self) -> IdentityResult<Option<UserIdentity>> {
        let raw = self.read(|record| record.user.clone()).await;
        Ok(raw.and_then(|raw| UserIdentity::from_session_value(&raw)))
    }

    async fn put_identity(&self, identity: &UserIdentity) -> IdentityResult<()> {
        let raw = identity.to_session_value()?;
        self.write(|record| record.user = Some(raw)).await;
        Ok(())
    }

    async fn get_access_token(&self) -> IdentityResult<Option<String>> {
        Ok(self.read(|record| record.token.clone()).await)
    }

    async fn put_access_token(&self, access_token: &str) -> IdentityResult<()> {
        self.write(|record| record.token = Some(access_token.to_string()))
            .await;
        Ok(())
    }

    async fn clear_all(&self) -> IdentityResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&self.session_id);
        Ok(())
    }
}
