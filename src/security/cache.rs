//! Short-lived cache of the last verified credential.

use std::sync::Mutex;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;

/// How long a verified credential is trusted without re-checking.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    digest: [u8; 32],
    verified_at: Instant,
}

/// Remembers one successful verification, keyed by credential hash.
///
/// A single slot: the server serves one administrative identity, so
/// only the most recent credential is kept. Time comes from
/// [`tokio::time::Instant`] and follows a paused test clock.
#[derive(Debug)]
pub struct AuthCache {
    entry: Mutex<Option<CacheEntry>>,
    ttl: Duration,
}

impl AuthCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Mutex::new(None),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether `credential` is byte-identical to the cached one and was
    /// verified less than the TTL ago.
    pub fn is_fresh(&self, credential: &str) -> bool {
        let digest = digest(credential);
        let guard = match self.entry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .as_ref()
            .map(|entry| entry.digest == digest && entry.verified_at.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    /// Record a successful verification of `credential` now.
    pub fn store(&self, credential: &str) {
        self.set(Some(CacheEntry {
            digest: digest(credential),
            verified_at: Instant::now(),
        }));
    }

    /// Forget the cached credential.
    pub fn clear(&self) {
        self.set(None);
    }

    fn set(&self, value: Option<CacheEntry>) {
        match self.entry.lock() {
            Ok(mut entry) => *entry = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

impl Default for AuthCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

fn digest(credential: &str) -> [u8; 32] {
    Sha256::digest(credential.as_bytes()).into()
}
