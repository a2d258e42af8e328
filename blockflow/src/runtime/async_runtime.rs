use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use crate::error::{BlockError, RuntimeError};
use crate::events::Envelope;
use crate::graph::Graph;
use crate::lifecycle::{Cause, Lifecycle};
use crate::queue::{EventQueue, PushOutcome};
use crate::runtime::config::RunConfig;

/// The asynchronous runtime (C8): cooperative sources are polled
/// concurrently as tasks each tick; blocking sources/processors are fanned
/// out to `tokio::task::spawn_blocking` so they never hold the scheduler.
/// Rejects a graph containing any parallel-offload processor — parallel
/// dispatch is exposed only through [`super::SyncRuntime`] (§4.8).
pub struct AsyncRuntime {
    graph: Graph,
    queue: EventQueue,
    lifecycle: Arc<Lifecycle>,
}

impl AsyncRuntime {
    pub fn new(graph: Graph, queue: EventQueue, lifecycle: Arc<Lifecycle>) -> Result<Self, RuntimeError> {
        if graph.parallel_count() > 0 {
            return Err(RuntimeError::ParallelOnSyncOnlyPath);
        }
        Ok(AsyncRuntime { graph, queue, lifecycle })
    }

    /// Runs ticks until the lifecycle is no longer alive. Identical loop
    /// control to [`super::SyncRuntime::run`]: one tick always runs first,
    /// `min_interval` bounds the gap between tick starts from below, and
    /// shutdown always runs on exit regardless of `config.once`.
    pub async fn run(&mut self, config: RunConfig) -> Result<(), RuntimeError> {
        let result = self.run_inner(config).await;
        self.shutdown().await;
        result
    }

    async fn run_inner(&mut self, config: RunConfig) -> Result<(), RuntimeError> {
        loop {
            let started = Instant::now();
            self.tick().await?;
            if config.once || !self.lifecycle.is_alive() {
                return Ok(());
            }
            let elapsed = started.elapsed();
            if elapsed < config.min_interval {
                tokio::time::sleep(config.min_interval - elapsed).await;
            }
        }
    }

    /// Polls every source concurrently, enqueues their emissions at the
    /// back, then drains the queue breadth-first (§4.8): each pass
    /// schedules every currently-queued event's processors as tasks,
    /// awaits them all, enqueues the results, and recurses while the
    /// queue is still non-empty.
    async fn tick(&mut self) -> Result<(), RuntimeError> {
        let new_events = self.poll_sources().await?;
        self.push_and_check_terminal(new_events)?;
        self.drain().await
    }

    async fn poll_sources(&mut self) -> Result<Vec<Envelope>, RuntimeError> {
        let mut set = JoinSet::new();
        for slot in self.graph.source_slots() {
            let slot = Arc::clone(slot);
            set.spawn(async move {
                let is_cooperative = slot.lock().await.is_cooperative();
                if is_cooperative {
                    let mut source = slot.lock().await;
                    let name = source.name().to_string();
                    let result = source.poll_dyn_async().await;
                    (name, result)
                } else {
                    tokio::task::spawn_blocking(move || {
                        let mut source = slot.blocking_lock();
                        let name = source.name().to_string();
                        let result = source.poll_dyn();
                        (name, result)
                    })
                    .await
                    .expect("blocking source poll task panicked")
                }
            });
        }

        let mut collected = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (name, result) = joined.expect("source polling task panicked");
            match result {
                Ok(envelopes) => collected.extend(envelopes),
                Err(cause) => {
                    self.lifecycle.stop(Cause::BlockError);
                    return Err(BlockError::source(name, cause).into());
                }
            }
        }
        Ok(collected)
    }

    fn push_and_check_terminal(&mut self, batch: Vec<Envelope>) -> Result<(), RuntimeError> {
        match self.queue.push_back_batch(batch) {
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

    async fn drain(&mut self) -> Result<(), RuntimeError> {
        if self.queue.is_empty() || !self.lifecycle.is_alive() {
            return Ok(());
        }

        let batch = self.queue.drain_all();
        let mut set = JoinSet::new();
        for envelope in batch {
            let Some(indices) = self.graph.dispatch().resolve(&envelope) else {
                tracing::debug!(event = envelope.type_name(), "no processor registered for event, dropping");
                continue;
            };
            for &index in indices {
                let slot = self.graph.processor_slot(index);
                let envelope = envelope.clone();
                set.spawn(async move {
                    let (name, is_cooperative) = {
                        let guard = slot.lock().await;
                        (guard.name().to_string(), guard.is_cooperative())
                    };
                    let result = if is_cooperative {
                        // `tokio::sync::Mutex`'s guard is `Send`, so
                        // holding it across this `.await` is fine — it's
                        // the same pattern `poll_sources` uses for a
                        // cooperative source.
                        let mut processor = slot.lock().await;
                        processor.process_dyn_async(envelope).await
                    } else {
                        tokio::task::spawn_blocking(move || {
                            let mut processor = slot.blocking_lock();
                            processor.process_dyn(envelope)
                        })
                        .await
                        .expect("blocking processor dispatch task panicked")
                    };
                    (name, result)
                });
            }
        }

        let mut produced = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (name, result) = joined.expect("processor dispatch task panicked");
            match result {
                Ok(emitted) => produced.extend(emitted),
                Err((input_type, cause)) => {
                    self.lifecycle.stop(Cause::BlockError);
                    return Err(BlockError::processor(name, input_type, cause).into());
                }
            }
        }

        self.push_and_check_terminal(produced)?;
        Box::pin(self.drain()).await
    }

    async fn shutdown(&mut self) {
        if !self.lifecycle.begin_shutdown() {
            return;
        }
        tracing::info!("shutting down: releasing sources, releasing processors");

        for slot in self.graph.source_slots() {
            let mut source = slot.lock().await;
            let is_cooperative = source.is_cooperative();
            let result = if is_cooperative { source.release_dyn_async().await } else { source.release_dyn() };
            if let Err(err) = result {
                tracing::error!(error = %err, "source release failed");
            }
        }

        let mut seen = std::collections::HashSet::new();
        for slot in self.graph.processor_slots() {
            let identity = Arc::as_ptr(slot) as *const ();
            if !seen.insert(identity) {
                continue;
            }
            let mut processor = slot.lock().await;
            let is_cooperative = processor.is_cooperative();
            let result = if is_cooperative { processor.release_dyn_async().await } else { processor.release_dyn() };
            if let Err(err) = result {
                tracing::error!(error = %err, "processor release failed");
            }
        }
    }
}
