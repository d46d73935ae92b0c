//! Bearer sessions.
//!
//! The raw token is only returned to the client; the store keeps its SHA-256
//! hash, so a leaked store does not yield usable tokens.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    clock::{saturating_seconds, Clock},
    error::Error,
};

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 43_200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub account_id: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Vec<u8>, SessionRecord>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: saturating_seconds(ttl_seconds),
            clock,
        }
    }

    /// Start a session and return the raw token.
    ///
    /// # Errors
    /// Fails if the OS random source is unavailable or the TTL overflows the
    /// clock.
    pub fn issue(&self, account_id: u64) -> Result<String> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .context("session ttl is out of range")?;
        let token = generate_session_token()?;
        let record = SessionRecord {
            account_id,
            issued_at: now,
            expires_at,
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hash_session_token(&token), record);
        Ok(token)
    }

    /// Resolve a raw token. Expired sessions are dropped on sight.
    ///
    /// # Errors
    /// `SessionRequired` for unknown tokens, `SessionExpired` past the TTL.
    pub fn resolve(&self, token: &str) -> Result<SessionRecord, Error> {
        let key = hash_session_token(token);
        let now = self.clock.now();
        let record = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or(Error::SessionRequired)?;

        if now > record.expires_at {
            self.sessions
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
            return Err(Error::SessionExpired);
        }
        Ok(record)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&hash_session_token(token))
            .is_some()
    }

    /// Drop every session of an account; returns how many went.
    pub fn revoke_account(&self, account_id: u64) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, record| record.account_id != account_id);
        before - sessions.len()
    }

    /// Drop sessions past their expiry; returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, record| now <= record.expires_at);
        before - sessions.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 32 random bytes, base64url without padding.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
