//! Cooperative stop signal shared by the workers of one search.

use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot, idempotent stop flag.
///
/// Created fresh for every search and lent to each worker; a worker that
/// reaches the threshold calls [`trigger`](Self::trigger), every worker
/// polls [`is_triggered`](Self::is_triggered) before each window.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal.  Setting it again has no further effect.
    pub fn trigger(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
