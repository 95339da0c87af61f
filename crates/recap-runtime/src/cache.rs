//! Time-bounded memo of finished reports, keyed by data root and year.
//!
//! Stale entries are never swept; they are ignored on read and overwritten by
//! the next successful run. Concurrent writers for the same key simply race,
//! and the last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use recap_core::models::AnnualReport;
use recap_core::settings::DEFAULT_CACHE_TTL_SECS;

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ── ReportCache ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CacheEntry {
    created_at: Instant,
    report: Arc<AnnualReport>,
}

pub struct ReportCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<(PathBuf, i32), CacheEntry>>,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS), Arc::new(SystemClock))
    }
}

impl ReportCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached report for `(root, year)` if it is younger than the TTL.
    pub fn get(&self, root: &Path, year: i32) -> Option<Arc<AnnualReport>> {
        let now = self.clock.now();
        let entries = self.lock();
        let entry = entries.get(&(root.to_path_buf(), year))?;
        if now.saturating_duration_since(entry.created_at) < self.ttl {
            Some(Arc::clone(&entry.report))
        } else {
            tracing::debug!(root = %root.display(), year, "cached report expired");
            None
        }
    }

    /// Store `report`, replacing whatever was there.
    pub fn put(&self, root: &Path, year: i32, report: Arc<AnnualReport>) {
        let entry = CacheEntry {
            created_at: self.clock.now(),
            report,
        };
        self.lock().insert((root.to_path_buf(), year), entry);
    }

    /// Drop every entry regardless of age. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        tracing::debug!(removed, "report cache cleared");
        removed
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<(PathBuf, i32), CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ReportCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
