//! Time-bounded one-shot token store.
//!
//! Holds email-confirmation and password-reset tokens. Entries expire after
//! their TTL; expired entries behave exactly like missing ones.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Keyed store with per-entry expiry, injected into `UserAuthService`.
pub trait TokenStore: Send + Sync {
    fn put(&self, token: &str, value: &str, ttl: Duration);

    /// Read without consuming.
    fn get(&self, token: &str) -> Option<String>;

    /// Read and remove. A token can be taken at most once.
    fn take(&self, token: &str) -> Option<String>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// DashMap-backed implementation. Expired entries are dropped lazily on access
/// and by `purge_expired`.
#[derive(Default)]
pub struct InMemoryTokenStore {
    store: DashMap<String, Entry>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Remove all expired entries. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.store.len();
        self.store.retain(|_, entry| entry.expires_at > now);
        before - self.store.len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn put(&self, token: &str, value: &str, ttl: Duration) {
        self.store.insert(
            token.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn get(&self, token: &str) -> Option<String> {
        let now = Instant::now();
        let value = {
            let entry = self.store.get(token)?;
            if entry.expires_at > now {
                Some(entry.value.clone())
            } else {
                None
            }
        };
        if value.is_none() {
            self.store.remove_if(token, |_, e| e.expires_at <= now);
        }
        value
    }

    fn take(&self, token: &str) -> Option<String> {
        let (_, entry) = self.store.remove(token)?;
        (entry.expires_at > Instant::now()).then_some(entry.value)
    }
}
