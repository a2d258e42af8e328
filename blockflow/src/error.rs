//! Error types for blockflow.
//!
//! One enum per failure domain, following the graph's own lifecycle:
//! wiring errors happen at `Graph::build`, runtime errors at `App::run`/
//! `run_async`, and block errors are produced by the blocks themselves
//! while the graph is live.

use std::any::TypeId;

use thiserror::Error;

/// Errors raised while assembling a [`crate::graph::Graph`] from blocks.
///
/// The distilled spec's `TypeError` for a block of "indeterminate role"
/// has no counterpart here: [`crate::graph::AnyBlock`] is already a
/// closed source/processor enum, so a block's kind is settled before it
/// ever reaches `Graph::build`.
#[derive(Error, Debug)]
pub enum WiringError {
    #[error("processor '{name}' declares no input event types")]
    MissingDeclaration { name: String },

    #[error("duplicate registration of block '{0}'")]
    DuplicateBlock(String),
}

/// Errors raised by [`crate::runtime`] at startup, before a single tick runs.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("graph contains a cooperative (async) block but was started with the synchronous runtime")]
    CooperativeOnSyncPath,

    #[error("graph contains a parallel-offload processor but was started with the asynchronous runtime")]
    ParallelOnSyncOnlyPath,

    #[error("graph wiring error: {0}")]
    Wiring(#[from] WiringError),

    #[error("block error: {0}")]
    Block(#[from] BlockError),

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Errors produced by a source or processor while the graph is running.
///
/// Carries the failing block's name and, for processors, the concrete
/// input event type name, so the runtime can log what was being
/// dispatched at the moment of failure.
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("source '{block}' failed: {cause}")]
    Source {
        block: String,
        #[source]
        cause: anyhow::Error,
    },

    #[error("processor '{block}' failed on input '{input_type}': {cause}")]
    Processor {
        block: String,
        input_type: &'static str,
        #[source]
        cause: anyhow::Error,
    },
}

impl BlockError {
    pub fn source(block: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        BlockError::Source {
            block: block.into(),
            cause: cause.into(),
        }
    }

    pub fn processor(
        block: impl Into<String>,
        input_type: &'static str,
        cause: impl Into<anyhow::Error>,
    ) -> Self {
        BlockError::Processor {
            block: block.into(),
            input_type,
            cause: cause.into(),
        }
    }
}

/// Error raised by the parallel-offload worker pool.
#[derive(Error, Debug)]
#[error("parallel processor '{block}' panicked or failed: {cause}")]
pub struct PoolError {
    pub block: String,
    pub input_type_id: TypeId,
    #[source]
    pub cause: anyhow::Error,
}

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;
