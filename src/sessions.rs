//! Session token registry
//!
//! Tokens are opaque: `token_bytes` bytes from the OS RNG, hex encoded. The
//! registry maps each live token to the username it was issued for, along
//! with its issue and expiry time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::AuthError;
use crate::models::Session;

/// Generate a new random token of `bytes` random bytes (`2 * bytes` hex chars).
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Server-scoped map from token to session.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: chrono::Duration,
    token_bytes: usize,
}

impl SessionRegistry {
    pub fn new(ttl: Duration, token_bytes: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            token_bytes,
        }
    }

    fn new_session(&self, username: &str, now: DateTime<Utc>) -> Session {
        Session {
            username: username.to_string(),
            issued_at: now,
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    // An existing entry must never be overwritten, however unlikely a collision.
    fn unused_token(&self, sessions: &HashMap<String, Session>) -> String {
        loop {
            let candidate = generate_token(self.token_bytes);
            if !sessions.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Issue a fresh token for `username`. Existing tokens for the same user
    /// stay valid.
    pub async fn issue(&self, username: &str) -> (String, Session) {
        let session = self.new_session(username, Utc::now());
        let mut sessions = self.sessions.write().await;

        let token = self.unused_token(&sessions);
        sessions.insert(token.clone(), session.clone());
        (token, session)
    }

    /// Look up a live token. Expired entries are evicted and reported as
    /// `InvalidToken`.
    pub async fn validate(&self, token: &str) -> Result<Session, AuthError> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return Err(AuthError::InvalidToken),
                Some(session) if !session.is_expired_at(now) => return Ok(session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions.get(token).is_some_and(|s| s.is_expired_at(now)) {
            sessions.remove(token);
            debug!("Evicted expired session on lookup");
        }
        Err(AuthError::InvalidToken)
    }

    /// Swap `old_token` for a new token bound to the same user.
    ///
    /// Removal and insertion happen under one write lock, so concurrent
    /// refreshes of the same token produce exactly one winner.
    pub async fn rotate(&self, old_token: &str) -> Result<(String, Session), AuthError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let old = sessions.remove(old_token).ok_or(AuthError::InvalidToken)?;
        if old.is_expired_at(now) {
            return Err(AuthError::InvalidToken);
        }

        let session = self.new_session(&old.username, now);
        let token = self.unused_token(&sessions);
        sessions.insert(token.clone(), session.clone());
        Ok((token, session))
    }

    /// Remove a token. Returns whether it was present.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop every expired session and return how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Periodically purge expired sessions until the returned handle is aborted.
pub fn spawn_sweeper(registry: Arc<SessionRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = registry.purge_expired().await;
            if removed > 0 {
                info!(removed, "Purged expired sessions");
            }
        }
    })
}
