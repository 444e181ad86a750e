//! Duplicate suppression for repeated clipboard notifications

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Captures of identical content closer together than this are one logical copy
pub const DUPLICATE_WINDOW_MS: i64 = 2_000;

/// Most recent stored capture with the content being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorCapture {
    pub id: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupResult {
    /// Content never stored before
    New,
    /// Same content stored inside the window
    Duplicate(i64), // prior item id
    /// Same content stored, but long enough ago to count as a fresh copy
    Expired(i64), // prior item id
}

impl DedupResult {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DedupResult::Duplicate(_))
    }
}

/// Suppresses the burst of change events a single copy action can fire.
/// It is not meant to deduplicate history over the long term.
#[derive(Debug, Clone, Copy)]
pub struct DuplicatePolicy {
    window_ms: i64,
}

impl DuplicatePolicy {
    pub fn new(window_ms: i64) -> Self {
        Self { window_ms }
    }

    pub fn with_defaults() -> Self {
        Self::new(DUPLICATE_WINDOW_MS)
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    pub fn check(&self, now_ms: i64, prior: Option<&PriorCapture>) -> DedupResult {
        match prior {
            Some(prior) if now_ms - prior.timestamp < self.window_ms => DedupResult::Duplicate(prior.id),
            Some(prior) => DedupResult::Expired(prior.id),
            None => DedupResult::New,
        }
    }
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Source of "now" for the duplicate check
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
