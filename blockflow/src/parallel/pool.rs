use std::panic::AssertUnwindSafe;

use crossbeam_channel::{Receiver, Sender};

use crate::error::PoolError;
use crate::events::Envelope;
use crate::graph::ProcessorSlot;

/// A completed (or failed) parallel dispatch, tagged with the
/// processor index it came from so the runtime can attribute errors
/// and, on success, reinsert the output through the standard push
/// discipline.
pub struct ParallelResult {
    pub processor_index: usize,
    pub outcome: Result<Vec<Envelope>, PoolError>,
}

/// Wraps a [`rayon::ThreadPool`] sized to the graph's count of
/// parallel-offload processors, named after the component the teacher
/// crate already calls out for this role. Submission never blocks the
/// caller; results are collected from a bounded completion channel.
pub struct ParallelPool {
    pool: rayon::ThreadPool,
    sender: Sender<ParallelResult>,
    receiver: Receiver<ParallelResult>,
}

impl ParallelPool {
    pub fn new(worker_count: usize) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count.max(1))
            .thread_name(|i| format!("blockflow-parallel-{i}"))
            .build()?;
        let (sender, receiver) = crossbeam_channel::unbounded();
        Ok(ParallelPool { pool, sender, receiver })
    }

    /// Ships `(processor, envelope)` to the pool. `processor_index`
    /// identifies the dispatch-table slot the result should be
    /// attributed to.
    pub fn submit(&self, processor_index: usize, processor: ProcessorSlot, envelope: Envelope) {
        let sender = self.sender.clone();
        self.pool.spawn(move || {
            let type_name = envelope.type_name();
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| processor.blocking_lock().process_dyn(envelope)));
            let result = match outcome {
                Ok(Ok(envelopes)) => Ok(envelopes),
                Ok(Err((_, cause))) => Err(PoolError {
                    block: type_name.to_string(),
                    input_type_id: std::any::TypeId::of::<()>(),
                    cause,
                }),
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "parallel processor panicked".to_string());
                    Err(PoolError {
                        block: type_name.to_string(),
                        input_type_id: std::any::TypeId::of::<()>(),
                        cause: anyhow::anyhow!(message),
                    })
                }
            };
            let _ = sender.send(ParallelResult { processor_index, outcome: result });
        });
    }

    /// Drains every result that has completed so far without blocking.
    /// Called once per tick after the inline dispatch pass.
    pub fn try_drain(&self) -> Vec<ParallelResult> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{parallel_processor, DynProcessor};
    use crate::events::{Envelope, Event};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Tick(u32);
    impl Event for Tick {
        fn type_name() -> &'static str {
            "Tick"
        }
    }

    #[derive(Debug, Clone)]
    struct Doubled(u32);
    impl Event for Doubled {
        fn type_name() -> &'static str {
            "Doubled"
        }
    }

    #[test]
    fn submit_runs_on_pool_and_is_drained() {
        let pool = ParallelPool::new(2).unwrap();
        let proc: Box<dyn DynProcessor> = Box::new(parallel_processor(|t: Tick| Ok(Doubled(t.0 * 2))));
        let slot: ProcessorSlot = Arc::new(Mutex::new(proc));

        pool.submit(0, slot, Envelope::new(Tick(21)));

        let mut results = Vec::new();
        while results.is_empty() {
            results = pool.try_drain();
        }
        assert_eq!(results.len(), 1);
        let envelopes = results.pop().unwrap().outcome.unwrap();
        assert_eq!(envelopes[0].downcast_ref::<Doubled>().unwrap().0, 42);
    }
}
