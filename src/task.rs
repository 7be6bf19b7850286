//! Small coordination primitives for background work.
//!
//! Worker threads never mutate application state; they report back over
//! channels. These helpers let the event loop tell whether a report is still
//! wanted: a `CancelToken` per request and a monotonic `Generations` counter
//! per bulk operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Cooperative cancellation flag shared with a worker thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Monotonic generation counter. Only the latest generation may commit.
#[derive(Debug, Default)]
pub struct Generations {
    latest: AtomicU64,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, making every earlier one stale.
    pub fn advance(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let worker_side = token.clone();
        assert!(!worker_side.is_cancelled());
        token.cancel();
        assert!(worker_side.is_cancelled());
    }

    #[test]
    fn only_latest_generation_is_current() {
        let generations = Generations::new();
        let first = generations.advance();
        let second = generations.advance();
        assert!(second > first);
        assert!(!generations.is_current(first));
        assert!(generations.is_current(second));
    }
}
