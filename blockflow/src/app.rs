//! `App`: the external entry point (§6). Collects a flat list of
//! blocks plus a handful of run-time settings, compiles them into a
//! [`crate::graph::Graph`], and drives the result with whichever
//! runtime the graph requires.
//!
//! Mirrors the reference implementation's top-level `Pipeline`/`run`
//! entry point, but as a consuming builder rather than a long-lived
//! object — `App` is spent by `run`/`run_async`.

use std::any::TypeId;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RuntimeError;
use crate::events::Event;
use crate::graph::{AnyBlock, Graph};
use crate::lifecycle::Lifecycle;
use crate::queue::EventQueue;
use crate::runtime::{AsyncRuntime, RunConfig, SyncRuntime};

/// A graph under construction: a flat `Vec<AnyBlock>` plus the handful
/// of settings that affect how it's compiled and run — which event
/// type (if any) stops the loop, the queue's back-pressure bound, and
/// whether per-processor latency metrics are collected.
pub struct App {
    blocks: Vec<AnyBlock>,
    terminal_type: Option<TypeId>,
    queue_capacity: Option<usize>,
    install_signal_handlers: bool,
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    collect_metric: bool,
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    metric_time_interval: Duration,
}

impl App {
    pub fn new(blocks: Vec<AnyBlock>) -> Self {
        App {
            blocks,
            terminal_type: None,
            queue_capacity: None,
            install_signal_handlers: true,
            collect_metric: false,
            metric_time_interval: Duration::from_secs(60),
        }
    }

    /// Marks `T` as the terminal event type (§4.7): once an event of
    /// this type, or any of its declared subtypes, is pushed, the
    /// queue drops it and the runtime stops after the current drain.
    pub fn terminal_event<T: Event>(mut self) -> Self {
        self.terminal_type = Some(TypeId::of::<T>());
        self
    }

    /// Bounds the event queue; a push beyond this many pending events
    /// fails the block that produced them instead of growing forever.
    /// Unbounded (`None`) by default, matching the reference
    /// implementation's `collections.deque`.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Whether `run`/`run_async` installs `SIGINT`/`SIGTERM` handlers
    /// that map onto a graceful stop (§4.10). Enabled by default;
    /// disable in a test binary or when the embedding process already
    /// owns signal handling.
    pub fn install_signal_handlers(mut self, enabled: bool) -> Self {
        self.install_signal_handlers = enabled;
        self
    }

    /// Enables per-processor latency aggregation (§9's metrics Open
    /// Question): every inline/cooperative processor is wrapped to
    /// time its dispatch, and an internal source emits
    /// `AggregatedMetric` events through the ordinary queue once
    /// `metric_time_interval` has elapsed for a given
    /// `(processor, event type)` pair. A no-op, with a warning, unless
    /// built with the `metrics` feature.
    pub fn collect_metric(mut self, enabled: bool) -> Self {
        self.collect_metric = enabled;
        self
    }

    /// The aggregation window `collect_metric(true)` uses. Defaults to
    /// 60 seconds.
    pub fn metric_time_interval(mut self, interval: Duration) -> Self {
        self.metric_time_interval = interval;
        self
    }

    #[cfg(feature = "metrics")]
    fn apply_metrics(blocks: Vec<AnyBlock>, interval: Duration) -> Vec<AnyBlock> {
        use crate::metrics::{MeteredProcessor, MetricCollector, MetricSource};

        let collector = MetricCollector::new(interval);
        let mut wrapped: Vec<AnyBlock> = blocks
            .into_iter()
            .map(|block| match block {
                AnyBlock::Processor(processor) => {
                    AnyBlock::Processor(Box::new(MeteredProcessor::new(processor, collector.clone())))
                }
                other => other,
            })
            .collect();
        wrapped.push(AnyBlock::source(MetricSource::new(collector)));
        wrapped
    }

    fn build(self) -> Result<(Graph, EventQueue, Arc<Lifecycle>), RuntimeError> {
        let blocks = self.blocks;
        #[cfg(feature = "metrics")]
        let blocks = if self.collect_metric {
            Self::apply_metrics(blocks, self.metric_time_interval)
        } else {
            blocks
        };
        #[cfg(not(feature = "metrics"))]
        if self.collect_metric {
            tracing::warn!("collect_metric(true) has no effect: blockflow was built without the `metrics` feature");
        }

        let graph = Graph::build(blocks)?;
        let mut queue = EventQueue::new(self.queue_capacity);
        if let Some(terminal_type) = self.terminal_type {
            queue.set_terminal_type(terminal_type);
        }
        let lifecycle = Arc::new(Lifecycle::new());

        if self.install_signal_handlers {
            if let Err(err) = crate::signals::install_signal_handlers(Arc::clone(&lifecycle)) {
                tracing::warn!(error = %err, "failed to install signal handlers");
            }
        }

        Ok((graph, queue, lifecycle))
    }

    /// Compiles the graph and runs it with [`SyncRuntime`] until the
    /// lifecycle stops. Fails fast at startup if the graph contains any
    /// cooperative block — use [`App::run_async`] for those. Blocks the
    /// calling thread; call it from a plain thread or
    /// `tokio::task::spawn_blocking`, never directly from inside an
    /// async task.
    pub fn run(self, config: RunConfig) -> Result<(), RuntimeError> {
        let (graph, queue, lifecycle) = self.build()?;
        let mut runtime = SyncRuntime::new(graph, queue, lifecycle)?;
        runtime.run(config)
    }

    /// Compiles the graph and runs it with [`AsyncRuntime`] until the
    /// lifecycle stops. Fails fast at startup if the graph contains any
    /// parallel-offload processor — those are only dispatched by
    /// [`App::run`]'s worker pool.
    pub async fn run_async(self, config: RunConfig) -> Result<(), RuntimeError> {
        let (graph, queue, lifecycle) = self.build()?;
        let mut runtime = AsyncRuntime::new(graph, queue, lifecycle)?;
        runtime.run(config).await
    }
}
