//! Process-local, TTL-bounded cache in front of the remote secret store.

use crate::errors::{require_non_empty, Result};
use crate::store::SecretStore;
use lru::LruCache;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_CAPACITY: usize = 256;
const TTL_ENV: &str = "VAULTKIT_CACHE_TTL_SECS";
const CAPACITY_ENV: &str = "VAULTKIT_CACHE_CAPACITY";

struct SecretEntry {
    value: String,
    expires_at: Instant,
}

/// Shared cache serving secret values with at-most-TTL staleness.
///
/// One instance is constructed per process and handed to every caller;
/// tests construct their own isolated instances. Entries are atomic per
/// key and no lock is held across a store call, so concurrent `get`/`set`/
/// `delete` for the same key settle on the last completed write.
pub struct SecretCache<S> {
    store: S,
    ttl: Duration,
    entries: Mutex<LruCache<String, SecretEntry>>,
}

impl<S> SecretCache<S>
where
    S: SecretStore,
{
    /// Construct a cache with environment-driven defaults
    /// (`VAULTKIT_CACHE_TTL_SECS`, `VAULTKIT_CACHE_CAPACITY`).
    pub fn new(store: S) -> Self {
        let ttl = std::env::var(TTL_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TTL_SECS));
        let capacity = std::env::var(CAPACITY_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_CAPACITY);
        Self::with_settings(store, ttl, capacity)
    }

    /// Construct a cache with explicit TTL and capacity.
    pub fn with_settings(store: S, ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            store,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cache TTL applied to fetched and written entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve a secret, serving a live cached entry without contacting
    /// the store. `Ok(None)` means the store does not hold the secret;
    /// negative results are never cached.
    pub async fn get(&self, name: &str) -> Result<Option<String>> {
        require_non_empty(name, "secret name")?;

        if let Some(value) = self.live_entry(name) {
            return Ok(Some(value));
        }

        let fetched = self.store.fetch_secret(name).await?;
        match fetched {
            Some(value) => {
                debug!(secret = name, "cache refresh from store");
                self.insert(name, &value);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Write a secret to the store, then refresh the local entry. The
    /// store write completing first is a hard ordering guarantee: a failed
    /// write leaves the cache untouched, so callers never observe a value
    /// the store did not accept.
    pub async fn set(&self, name: &str, value: &str) -> Result<()> {
        require_non_empty(name, "secret name")?;
        self.store.write_secret(name, value).await?;
        self.insert(name, value);
        Ok(())
    }

    /// Delete a secret. The store-side delete is a long-running operation;
    /// the local entry is evicted only after the store confirms completion.
    pub async fn delete(&self, name: &str) -> Result<()> {
        require_non_empty(name, "secret name")?;
        let operation = self.store.begin_delete_secret(name).await?;
        self.store.await_deletion(operation).await?;
        self.purge(name);
        Ok(())
    }

    /// Best-effort bulk read of all enabled secrets. Names whose
    /// individual fetch fails are skipped and logged; partial results are
    /// not an error.
    pub async fn get_all(&self) -> Result<BTreeMap<String, String>> {
        let listings = self.store.list_secrets().await?;
        let mut values = BTreeMap::new();

        for listing in listings {
            if !listing.enabled {
                continue;
            }
            match self.get(&listing.name).await {
                Ok(Some(value)) => {
                    values.insert(listing.name, value);
                }
                Ok(None) => {
                    debug!(secret = %listing.name, "listed secret vanished before fetch");
                }
                Err(err) => {
                    warn!(secret = %listing.name, error = %err, "skipping secret in bulk read");
                }
            }
        }

        Ok(values)
    }

    /// Evict a single local entry without touching the store.
    pub fn purge(&self, name: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.pop(name);
    }

    /// Drop every local entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
    }

    fn live_entry(&self, name: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get(name) {
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
        }
        // Expired entries are indistinguishable from misses.
        entries.pop(name);
        None
    }

    fn insert(&self, name: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.put(
            name.to_string(),
            SecretEntry {
                value: value.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }
}

impl<S> SecretCache<Arc<S>>
where
    S: SecretStore + ?Sized,
{
    /// Handle to the underlying store shared with other components.
    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }
}
