//! In-memory, time-bounded cache of peak rain probabilities.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default freshness window for cached peaks
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Source of "now" in epoch milliseconds
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to. Used to exercise expiry.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: u8,
    timestamp: i64,
}

/// Peak probability per city.
///
/// Entries go stale `ttl` after they were written and are then ignored until
/// the next write replaces them. Nothing is ever swept.
#[derive(Debug)]
pub struct RainCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl_millis: i64,
    clock: Arc<dyn Clock>,
}

impl RainCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            clock,
        }
    }

    /// Cached probability for `city`, if written less than `ttl` ago.
    pub fn get(&self, city: &str) -> Option<u8> {
        let now = self.clock.now_millis();
        let entries = self.entries.lock();
        let entry = entries.get(city)?;

        if now.saturating_sub(entry.timestamp) < self.ttl_millis {
            tracing::debug!("Rain cache hit for {}", city);
            Some(entry.value)
        } else {
            tracing::debug!("Rain cache entry for {} is stale", city);
            None
        }
    }

    pub fn insert(&self, city: &str, value: u8) {
        let entry = CacheEntry {
            value,
            timestamp: self.clock.now_millis(),
        };
        self.entries.lock().insert(city.to_string(), entry);
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RainCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
