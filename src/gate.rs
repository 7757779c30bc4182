//! Exclusion gate for the repaint/export critical section
//!
//! Completion callbacks, the repaint tick, and keypress-triggered exports all
//! write to the same terminal and the same export-status map. The gate
//! serializes those sections: at most one closure runs at a time per gate.
//! No fairness or ordering is promised beyond single-holder exclusion.

use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to one exclusion region.
#[derive(Clone, Default)]
pub struct Gate {
    lock: Arc<Mutex<()>>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the gate. The lock is released when `f`
    /// returns, and on unwind if `f` panics.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _held = self.lock.lock();
        f()
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate").finish()
    }
}
