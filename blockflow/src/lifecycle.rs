//! The lifecycle controller (C10): a liveness flag every runtime checks
//! once per tick, and the ordered shutdown sequence — terminate the
//! worker pool, release sources, release processors — run exactly once
//! regardless of which of the three triggers (terminal event, explicit
//! stop, unrecoverable error) fired it.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Why the graph stopped running. Recorded for the shutdown log line,
/// nothing more — no trigger is treated specially by the shutdown
/// sequence itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    Terminal,
    Explicit,
    BlockError,
    PoolError,
    Signal,
}

pub struct Lifecycle {
    alive: AtomicBool,
    cause: Mutex<Option<Cause>>,
    shut_down: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            alive: AtomicBool::new(true),
            cause: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Flips the liveness flag off. Idempotent: only the first call's
    /// cause is recorded.
    pub fn stop(&self, cause: Cause) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        *self.cause.lock() = Some(cause);
        tracing::info!(?cause, "graph stopping");
    }

    pub fn cause(&self) -> Option<Cause> {
        *self.cause.lock()
    }

    /// Marks shutdown as having run. Returns `true` the first time it's
    /// called (the caller should proceed to actually release blocks),
    /// `false` on any subsequent call.
    pub fn begin_shutdown(&self) -> bool {
        !self.shut_down.swap(true, Ordering::SeqCst)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_idempotent_first_cause_wins() {
        let lc = Lifecycle::new();
        assert!(lc.is_alive());
        lc.stop(Cause::Terminal);
        lc.stop(Cause::Explicit);
        assert!(!lc.is_alive());
        assert_eq!(lc.cause(), Some(Cause::Terminal));
    }

    #[test]
    fn begin_shutdown_runs_once() {
        let lc = Lifecycle::new();
        assert!(lc.begin_shutdown());
        assert!(!lc.begin_shutdown());
    }
}
