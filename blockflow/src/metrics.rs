//! Per-processor latency aggregation (ambient, feature `metrics`):
//! resolves spec.md §9's Open Question by implementing metric emission as
//! a regular block rather than a privileged side channel, directly
//! grounded in `original_source/blocks/metric_collector.py`'s
//! `MetricCollector`/`AggregatedMetric`.
//!
//! [`MeteredProcessor`] wraps any [`crate::blocks::DynProcessor`], timing
//! each `process_dyn`/`process_dyn_async` call and recording it into a
//! shared [`MetricCollector`]; [`MetricSource`] is an ordinary
//! [`crate::blocks::BlockingSource`] that polls the collector once per tick
//! and emits whichever `(processor, event type)` pairs have crossed
//! `metric_time_interval`, as `AggregatedMetric` events flowing through the
//! same queue and dispatch table as anything else in the graph — a user
//! sinks them with a plain `processor(|m: AggregatedMetric| ...)`.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use blockflow_macros::Event;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::blocks::{DispatchClass, DynProcessor, Identity};
use crate::events::Envelope;

/// Emitted once per `(processor, event type)` pair whenever the span
/// between its first and most recent observation exceeds the configured
/// `metric_time_interval`.
#[derive(Debug, Clone, Serialize, Deserialize, Event)]
pub struct AggregatedMetric {
    pub processor: String,
    pub event_type: &'static str,
    pub interval_secs: f64,
    pub count: usize,
    pub max_processing_secs: f64,
    pub min_processing_secs: f64,
    pub avg_processing_secs: f64,
}

struct Timing {
    start: Instant,
    end: Instant,
}

struct Bucket {
    processor: String,
    event_type: &'static str,
    timings: Vec<Timing>,
}

/// Shared bookkeeping a [`MeteredProcessor`] reports into and a
/// [`MetricSource`] drains from. Cheap to clone — an `Arc` around the
/// actual state.
#[derive(Clone)]
pub struct MetricCollector {
    interval: Duration,
    inner: Arc<Mutex<HashMap<(Identity, &'static str), Bucket>>>,
}

impl MetricCollector {
    pub fn new(interval: Duration) -> Self {
        MetricCollector {
            interval,
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn record(&self, identity: Identity, processor: &str, event_type: &'static str, timing: Timing) {
        let mut guard = self.inner.lock();
        // Keyed by processor identity plus event-type name: distinct event
        // types feeding the same processor are tracked as separate
        // buckets, matching the reference's per-(processor, event)
        // grouping.
        let key = (identity, event_type);
        let entry = guard.entry(key).or_insert_with(|| Bucket {
            processor: processor.to_string(),
            event_type,
            timings: Vec::new(),
        });
        entry.timings.push(timing);
    }

    /// Removes and returns every bucket whose span has crossed the
    /// interval, resetting it so a later call starts a fresh window for
    /// that `(processor, event type)` pair.
    fn drain_due(&self) -> Vec<AggregatedMetric> {
        let mut guard = self.inner.lock();
        let mut due = Vec::new();
        guard.retain(|_, bucket| {
            let Some(first) = bucket.timings.first() else {
                return false;
            };
            let Some(last) = bucket.timings.last() else {
                return false;
            };
            let span = last.end.duration_since(first.start);
            if span < self.interval {
                return true;
            }
            let count = bucket.timings.len();
            let mut max = Duration::ZERO;
            let mut min = Duration::MAX;
            let mut total = Duration::ZERO;
            for timing in &bucket.timings {
                let elapsed = timing.end.duration_since(timing.start);
                max = max.max(elapsed);
                min = min.min(elapsed);
                total += elapsed;
            }
            due.push(AggregatedMetric {
                processor: bucket.processor.clone(),
                event_type: bucket.event_type,
                interval_secs: span.as_secs_f64(),
                count,
                max_processing_secs: max.as_secs_f64(),
                min_processing_secs: min.as_secs_f64(),
                avg_processing_secs: (total.as_secs_f64()) / (count as f64),
            });
            false
        });
        due
    }
}

/// Wraps a [`DynProcessor`] so every dispatch is timed and reported to a
/// shared [`MetricCollector`], otherwise forwarding unchanged — identity,
/// dispatch class, declared types, and release all delegate to the
/// wrapped processor.
pub struct MeteredProcessor {
    inner: Box<dyn DynProcessor>,
    collector: MetricCollector,
}

impl MeteredProcessor {
    pub fn new(inner: Box<dyn DynProcessor>, collector: MetricCollector) -> Self {
        MeteredProcessor { inner, collector }
    }
}

#[async_trait]
impl DynProcessor for MeteredProcessor {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn declared_input_types(&self) -> Vec<TypeId> {
        self.inner.declared_input_types()
    }

    fn declared_output_types(&self) -> Vec<TypeId> {
        self.inner.declared_output_types()
    }

    fn dispatch_class(&self) -> DispatchClass {
        self.inner.dispatch_class()
    }

    fn is_cooperative(&self) -> bool {
        self.inner.is_cooperative()
    }

    fn identity(&self) -> Identity {
        self.inner.identity()
    }

    fn process_dyn(&mut self, envelope: Envelope) -> Result<Vec<Envelope>, (&'static str, anyhow::Error)> {
        let name = self.inner.name().to_string();
        let event_type = envelope.type_name();
        let start = Instant::now();
        let result = self.inner.process_dyn(envelope);
        let end = Instant::now();
        self.collector.record(self.inner.identity(), &name, event_type, Timing { start, end });
        result
    }

    async fn process_dyn_async(
        &mut self,
        envelope: Envelope,
    ) -> Result<Vec<Envelope>, (&'static str, anyhow::Error)> {
        let name = self.inner.name().to_string();
        let event_type = envelope.type_name();
        let start = Instant::now();
        let result = self.inner.process_dyn_async(envelope).await;
        let end = Instant::now();
        self.collector.record(self.inner.identity(), &name, event_type, Timing { start, end });
        result
    }

    fn release_dyn(&mut self) -> anyhow::Result<()> {
        self.inner.release_dyn()
    }

    async fn release_dyn_async(&mut self) -> anyhow::Result<()> {
        self.inner.release_dyn_async().await
    }
}

/// A regular blocking source: once per tick, drains whichever buckets
/// have crossed `metric_time_interval` and emits them as
/// `AggregatedMetric` events through the standard insertion rule.
pub struct MetricSource {
    collector: MetricCollector,
}

impl MetricSource {
    pub fn new(collector: MetricCollector) -> Self {
        MetricSource { collector }
    }
}

impl crate::blocks::BlockingSource for MetricSource {
    type Output = Vec<AggregatedMetric>;

    fn poll(&mut self) -> anyhow::Result<Self::Output> {
        Ok(self.collector.drain_due())
    }

    fn name(&self) -> &str {
        "blockflow::metrics::MetricSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::processor;
    use crate::events::Event as _;
    use std::thread::sleep;

    #[derive(Debug, Clone)]
    struct Tick(u32);
    impl crate::events::Event for Tick {
        fn type_name() -> &'static str {
            "Tick"
        }
    }

    #[test]
    fn aggregates_after_interval_elapses() {
        let collector = MetricCollector::new(Duration::from_millis(1));
        let proc: Box<dyn DynProcessor> = Box::new(processor(|t: Tick| Ok(Tick(t.0 + 1))));
        let mut metered = MeteredProcessor::new(proc, collector.clone());

        metered.process_dyn(Envelope::new(Tick(1))).unwrap();
        sleep(Duration::from_millis(2));
        metered.process_dyn(Envelope::new(Tick(2))).unwrap();

        let due = collector.drain_due();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].count, 2);
    }
}
