//! Parallel offload (C9): a work-stealing pool for processors marked
//! [`crate::blocks::DispatchClass::ParallelOffload`]. A tick ships the
//! triggering envelope to the pool instead of dispatching inline; the
//! pool's result re-enters the queue on a later tick through the same
//! insertion rule as any other processor emission.

mod pool;

pub use pool::{ParallelPool, ParallelResult};
