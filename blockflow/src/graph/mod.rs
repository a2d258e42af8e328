//! The graph builder (C4) and dispatch table (C5): wiring a flat list
//! of blocks into a type-routed processing graph, and resolving a
//! concrete event type to the processors that should see it, with
//! ancestor-chain fallback for subtype dispatch.

mod builder;
mod dispatch;

pub use builder::{AnyBlock, Graph, ProcessorSlot, SourceSlot};
pub use dispatch::DispatchTable;
