//! Process-wide cache of delegated-auth tokens.
//!
//! Token exchange against an upstream source is a network round trip, so
//! tokens are cached per user and reused across requests until they near
//! expiry. The safety margin exists so a token is never handed to a caller
//! that might expire mid-request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use time::Duration;

use crate::UtcDateTime;
use crate::adapters::SourceError;

/// Opaque token material with its expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub secret: String,
    pub expires_at: UtcDateTime,
}

impl CachedToken {
    pub fn new(secret: impl Into<String>, expires_at: UtcDateTime) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    fn is_valid(&self, margin: Duration) -> bool {
        UtcDateTime::now().saturating_add(margin) < self.expires_at
    }
}

/// Shared token cache keyed by user identity.
///
/// The check-validity/exchange/store sequence is atomic per key: each key
/// owns an async mutex held across the whole sequence, so concurrent
/// requests for the same user never perform a redundant exchange and never
/// observe a half-written entry. Entries are replaced on refresh, never
/// merged.
#[derive(Debug)]
pub struct TokenCache {
    entries: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Option<CachedToken>>>>>,
    margin: Duration,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::with_margin(Duration::seconds(1))
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margin(margin: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            margin,
        }
    }

    /// Returns the cached token for `key` if it will outlive the safety
    /// margin; otherwise runs `exchange` exactly once and stores its result.
    pub async fn get_or_exchange<F, Fut>(&self, key: &str, exchange: F) -> Result<String, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken, SourceError>>,
    {
        let slot = {
            let mut entries = self
                .entries
                .lock()
                .expect("token cache should not be poisoned");
            entries.entry(key.to_owned()).or_default().clone()
        };

        let mut entry = slot.lock().await;

        if let Some(token) = entry.as_ref() {
            if token.is_valid(self.margin) {
                return Ok(token.secret.clone());
            }
        }

        let fresh = exchange().await?;
        let secret = fresh.secret.clone();
        *entry = Some(fresh);
        Ok(secret)
    }

    /// Number of users with a cached entry, valid or not.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("token cache should not be poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("token cache should not be poisoned")
            .clear();
    }
}
