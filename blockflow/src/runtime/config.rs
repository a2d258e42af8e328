use std::time::Duration;

/// Run-loop controls shared by [`super::SyncRuntime::run`] and
/// [`super::AsyncRuntime::run`].
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Lower bound on the wall-clock time between the start of one tick
    /// and the next. Never an upper bound: a tick that overruns it just
    /// runs back-to-back with the next one.
    pub min_interval: Duration,
    /// Run exactly one tick, then shut down, regardless of
    /// `min_interval`.
    pub once: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            min_interval: Duration::ZERO,
            once: false,
        }
    }
}

impl RunConfig {
    pub fn once() -> Self {
        RunConfig {
            once: true,
            ..Default::default()
        }
    }

    pub fn with_min_interval(min_interval: Duration) -> Self {
        RunConfig {
            min_interval,
            once: false,
        }
    }
}
