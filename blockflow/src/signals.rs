//! Native OS signal handling (ambient): SIGINT/SIGTERM map onto the same
//! graceful-stop path as an injected terminal event (§5's "external
//! cancellation is expressed as injecting a terminal event"), adapted
//! from the teacher's `core/signals.rs`.
//!
//! Installed once per process; a second call is a no-op rather than an
//! error, since an `App` may be constructed more than once in a test
//! binary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::lifecycle::{Cause, Lifecycle};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs a Ctrl+C handler (all platforms) and, on non-macOS Unix, a
/// `SIGTERM` handler, both of which call `lifecycle.stop(Cause::Signal)`
/// rather than terminating the process directly — the running loop
/// notices on its next liveness check and proceeds through the ordinary
/// shutdown sequence.
pub fn install_signal_handlers(lifecycle: Arc<Lifecycle>) -> std::io::Result<()> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        tracing::debug!("signal handlers already installed, skipping");
        return Ok(());
    }

    let ctrlc_lifecycle = Arc::clone(&lifecycle);
    ctrlc::set_handler(move || {
        tracing::info!("SIGINT received, stopping");
        ctrlc_lifecycle.stop(Cause::Signal);
    })
    .map_err(|err| std::io::Error::other(err.to_string()))?;

    #[cfg(all(unix, not(target_os = "macos")))]
    install_sigterm_handler(lifecycle)?;
    #[cfg(not(all(unix, not(target_os = "macos"))))]
    let _ = lifecycle;

    Ok(())
}

#[cfg(all(unix, not(target_os = "macos")))]
fn install_sigterm_handler(lifecycle: Arc<Lifecycle>) -> std::io::Result<()> {
    use signal_hook::consts::signal::SIGTERM;

    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&flag))?;

    std::thread::Builder::new().name("blockflow-sigterm".into()).spawn(move || {
        while !flag.load(Ordering::Relaxed) {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        tracing::info!("SIGTERM received, stopping");
        lifecycle.stop(Cause::Signal);
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent() {
        INSTALLED.store(false, Ordering::SeqCst);
        let lifecycle = Arc::new(Lifecycle::new());
        assert!(install_signal_handlers(Arc::clone(&lifecycle)).is_ok());
        assert!(install_signal_handlers(lifecycle).is_ok());
    }
}
