//! Block interfaces (C2): the four block kinds a graph can be built
//! from, their object-safe `Dyn*` counterparts for heterogeneous
//! storage, and the generic function-wrapper builders that let a plain
//! function satisfy any of the four.

mod fn_adapters;
mod processor;
mod release;
mod source;

pub use fn_adapters::{async_processor, async_source, parallel_processor, processor, source};
pub use processor::{BlockingProcessor, CooperativeProcessor, DynProcessor};
pub use release::release_all;
pub use source::{BlockingSource, CooperativeSource, DynSource};

/// How a [`BlockingProcessor`] is dispatched once its input is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchClass {
    /// Run on the runtime's own thread, in the tick that produced the input.
    Inline,
    /// Ship `(function, event)` to the parallel worker pool (C9); the
    /// result re-enters the queue on a later tick via the standard
    /// insertion rule.
    ParallelOffload,
}

impl Default for DispatchClass {
    fn default() -> Self {
        DispatchClass::Inline
    }
}

/// Identity used to dedup release hooks across sources and processors
/// that may appear in more than one routing slot (C10).
pub type Identity = *const ();
