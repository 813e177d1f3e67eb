//! Admin sessions: a bounded, expiring token map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A freshly issued admin session.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// In-memory admin sessions keyed by token.
///
/// [`validate`](Self::validate) never mutates; expired entries are removed by
/// [`sweep`](Self::sweep) (scheduled) and before every [`issue`](Self::issue).
/// At capacity the session closest to expiry is evicted.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Instant>>>,
    secret_key: Arc<str>,
    ttl: Duration,
    capacity: usize,
}

impl SessionStore {
    #[must_use]
    pub fn new(secret_key: &str, ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            secret_key: Arc::from(secret_key),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub async fn issue(&self) -> IssuedSession {
        let token = session_token(&self.secret_key, &rand::random::<[u8; 32]>());
        let now = Instant::now();

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, expires| *expires > now);
        while sessions.len() >= self.capacity {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, expires)| **expires)
                .map(|(token, _)| token.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::debug!("admin session evicted at capacity");
        }
        sessions.insert(token.clone(), now + self.ttl);
        drop(sessions);

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        IssuedSession {
            token,
            expires_at: Utc::now()
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Whether `token` names a live session.
    pub async fn validate(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .await
            .get(token)
            .is_some_and(|expires| *expires > Instant::now())
    }

    /// Drop a session; returns whether it existed.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().await.remove(token).is_some()
    }

    /// Remove expired sessions and return how many were dropped.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, expires| *expires > now);
        before - sessions.len()
    }

    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

fn session_token(secret_key: &str, nonce: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hasher.update(nonce);
    format!("{:x}", hasher.finalize())
}

/// Constant-time password comparison.
#[must_use]
pub fn password_matches(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}
