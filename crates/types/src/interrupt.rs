//! Cooperative interrupt flag for long backward walks.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared stop flag polled by trims and ancestor scans.
///
/// Those walks can span arbitrarily long stretches of chain, so the engine
/// checks the flag at loop boundaries and winds down cleanly once it has
/// been raised. Clones share the flag: the node keeps one handle to trigger
/// shutdown, each engine polls another. The flag latches; there is no way to
/// lower it again.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    triggered: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask in-flight walks to stop at their next loop boundary.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Relaxed);
    }

    /// True once an interrupt was requested. Cheap enough to poll per step.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Relaxed)
    }
}
