//! The two runtimes (C7/C8): a synchronous tick loop with depth-first
//! queue draining, and an asynchronous cooperative loop with
//! breadth-first per-tick draining. Both share the same [`Graph`],
//! [`EventQueue`], and [`crate::lifecycle::Lifecycle`].

mod async_runtime;
mod config;
mod sync_runtime;

pub use async_runtime::AsyncRuntime;
pub use config::RunConfig;
pub use sync_runtime::SyncRuntime;
