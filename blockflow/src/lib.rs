//! blockflow: typed, event-driven dataflow graphs built from plain
//! functions and derived event types.
//!
//! A graph is a flat list of blocks — sources that produce events,
//! processors that consume one declared event type (or a union of
//! them) and emit zero or more events — wired together purely by
//! declared type, never by hand-written edges. [`app::App`] compiles
//! the block list into a [`graph::Graph`] and drives it with either
//! [`runtime::SyncRuntime`] (blocking blocks, optional parallel
//! offload) or [`runtime::AsyncRuntime`] (cooperative blocks).
//!
//! ```ignore
//! use blockflow::prelude::*;
//!
//! #[derive(Event, Clone, Debug)]
//! struct Tick(u64);
//!
//! #[derive(Event, Clone, Debug)]
//! struct Doubled(u64);
//!
//! let mut n = 0;
//! let app = App::new(vec![
//!     AnyBlock::source(source(move || { n += 1; Ok(Tick(n)) })),
//!     AnyBlock::processor(processor(|t: Tick| Ok(Doubled(t.0 * 2)))),
//! ]);
//! app.run(RunConfig::once()).unwrap();
//! ```
//!
//! `extern crate self as blockflow` lets `#[derive(Event)]`/
//! `#[derive(EventUnion)]`'s generated `::blockflow::...` paths resolve
//! both for downstream consumers and for event types declared inside
//! this crate itself (see [`metrics::AggregatedMetric`]).
extern crate self as blockflow;

pub mod app;
pub mod blocks;
pub mod emission;
pub mod error;
pub mod events;
pub mod graph;
pub mod input;
pub mod lifecycle;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod parallel;
pub mod queue;
pub mod runtime;
pub mod signals;

pub use app::App;
pub use blockflow_macros::{Event, EventUnion};
pub use error::{BlockError, PoolError, Result, RuntimeError, WiringError};
pub use events::Envelope;
pub use runtime::RunConfig;

/// Everything most callers need in scope: the block-builder functions,
/// `App`/`RunConfig`, and the core traits. The derive macros
/// (`Event`, `EventUnion`) are exported at the crate root since they
/// share a name with [`events::Event`] and [`emission::Emission`]'s
/// union shape — Rust keeps derive macros and traits in separate
/// namespaces, so `use blockflow::Event;` brings in both without
/// collision.
pub mod prelude {
    pub use crate::app::App;
    pub use crate::blocks::{
        async_processor, async_source, parallel_processor, processor, source, BlockingProcessor, BlockingSource,
        CooperativeProcessor, CooperativeSource,
    };
    pub use crate::emission::Emission;
    pub use crate::events::Event;
    pub use crate::graph::AnyBlock;
    pub use crate::input::FromEnvelope;
    pub use crate::runtime::RunConfig;
    pub use crate::{Event as EventDerive, EventUnion};
}
