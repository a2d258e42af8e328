use std::sync::Arc;
use std::time::Instant;

use crate::blocks::{release_all, DispatchClass};
use crate::error::{BlockError, RuntimeError};
use crate::events::Envelope;
use crate::graph::Graph;
use crate::lifecycle::{Cause, Lifecycle};
use crate::parallel::ParallelPool;
use crate::queue::{EventQueue, PushOutcome};
use crate::runtime::config::RunConfig;

/// The synchronous runtime (C7): single-threaded tick loop, depth-first
/// queue draining. Rejects a graph containing any cooperative block —
/// use [`super::AsyncRuntime`] for those.
pub struct SyncRuntime {
    graph: Graph,
    queue: EventQueue,
    lifecycle: Arc<Lifecycle>,
    parallel_pool: Option<ParallelPool>,
}

impl SyncRuntime {
    pub fn new(graph: Graph, queue: EventQueue, lifecycle: Arc<Lifecycle>) -> Result<Self, RuntimeError> {
        if graph.contains_cooperative() {
            return Err(RuntimeError::CooperativeOnSyncPath);
        }
        let parallel_pool = if graph.parallel_count() > 0 {
            Some(ParallelPool::new(graph.parallel_count()).map_err(|e| RuntimeError::Block(BlockError::source("parallel pool", e)))?)
        } else {
            None
        };
        Ok(SyncRuntime { graph, queue, lifecycle, parallel_pool })
    }

    /// Runs ticks until the lifecycle is no longer alive, honoring
    /// `min_interval` as a lower bound between tick starts. Always runs
    /// shutdown on exit, including when `config.once` is set.
    pub fn run(&mut self, config: RunConfig) -> Result<(), RuntimeError> {
        let result = self.run_inner(config);
        self.shutdown();
        result
    }

    fn run_inner(&mut self, config: RunConfig) -> Result<(), RuntimeError> {
        loop {
            let started = Instant::now();
            self.tick()?;
            if config.once || !self.lifecycle.is_alive() {
                return Ok(());
            }
            let elapsed = started.elapsed();
            if elapsed < config.min_interval {
                std::thread::sleep(config.min_interval - elapsed);
            }
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        let mut new_events = Vec::new();
        for slot in self.graph.source_slots() {
            let mut source = slot.blocking_lock();
            match source.poll_dyn() {
                Ok(envelopes) => new_events.extend(envelopes),
                Err(cause) => {
                    let name = source.name().to_string();
                    drop(source);
                    self.lifecycle.stop(Cause::BlockError);
                    return Err(BlockError::source(name, cause).into());
                }
            }
        }

        self.push_and_check_terminal(new_events)?;
        self.drain_queue()?;
        self.drain_parallel_results()?;
        self.drain_queue()
    }

    fn push_and_check_terminal(&mut self, batch: Vec<Envelope>) -> Result<(), RuntimeError> {
        match self.queue.push_front_batch(batch) {
            Ok(PushOutcome::Terminal) => {
                self.lifecycle.stop(Cause::Terminal);
                Ok(())
            }
            Ok(PushOutcome::Normal) => Ok(()),
            Err(full) => {
                self.lifecycle.stop(Cause::BlockError);
                Err(BlockError::source("event queue", full).into())
            }
        }
    }

    fn drain_queue(&mut self) -> Result<(), RuntimeError> {
        while self.lifecycle.is_alive() {
            let Some(envelope) = self.queue.pop_front() else {
                break;
            };
            self.dispatch_one(envelope)?;
        }
        Ok(())
    }

    fn dispatch_one(&mut self, envelope: Envelope) -> Result<(), RuntimeError> {
        let Some(indices) = self.graph.dispatch().resolve(&envelope) else {
            tracing::debug!(event = envelope.type_name(), "no processor registered for event, dropping");
            return Ok(());
        };
        let indices = indices.to_vec();

        for index in indices {
            let slot = self.graph.processor_slot(index);
            let class = slot.blocking_lock().dispatch_class();
            match class {
                DispatchClass::Inline => {
                    let result = slot.blocking_lock().process_dyn(envelope.clone());
                    match result {
                        Ok(emitted) => self.push_and_check_terminal(emitted)?,
                        Err((input_type, cause)) => {
                            let name = slot.blocking_lock().name().to_string();
                            self.lifecycle.stop(Cause::BlockError);
                            return Err(BlockError::processor(name, input_type, cause).into());
                        }
                    }
                }
                DispatchClass::ParallelOffload => {
                    let pool = self.parallel_pool.as_ref().expect("parallel_count > 0 implies a pool exists");
                    pool.submit(index, slot, envelope.clone());
                }
            }
        }
        Ok(())
    }

    fn drain_parallel_results(&mut self) -> Result<(), RuntimeError> {
        let Some(pool) = self.parallel_pool.as_ref() else {
            return Ok(());
        };
        for result in pool.try_drain() {
            match result.outcome {
                Ok(emitted) => self.push_and_check_terminal(emitted)?,
                Err(err) => {
                    self.lifecycle.stop(Cause::PoolError);
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.lifecycle.begin_shutdown() {
            return;
        }
        tracing::info!("shutting down: terminating parallel pool, releasing sources, releasing processors");
        // The pool is dropped here (its threads finish their current
        // work and exit); no in-flight result is awaited.
        self.parallel_pool = None;

        let source_errors = release_all(
            self.graph.source_slots().to_vec(),
            |s| Arc::as_ptr(s) as *const (),
            |s| s.blocking_lock().release_dyn(),
        );
        for err in &source_errors {
            tracing::error!(error = %err, "source release failed");
        }

        let processor_errors = release_all(
            self.graph.processor_slots().to_vec(),
            |p| {
                let ptr = Arc::as_ptr(p) as *const ();
                ptr
            },
            |p| p.blocking_lock().release_dyn(),
        );
        for err in &processor_errors {
            tracing::error!(error = %err, "processor release failed");
        }
    }
}
