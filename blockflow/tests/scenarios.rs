//! End-to-end coverage of the graph's ordering/lifecycle invariants,
//! driven entirely through the public `App`/`AnyBlock` surface rather
//! than any single module's internals — scenarios S1, S4, S5, S6 and
//! invariants 6 (once semantics + release hooks) and 8 (error
//! containment) from the seed scenario list.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use blockflow::prelude::*;

#[derive(Debug, Clone)]
struct E(u32);
impl Event for E {
    fn type_name() -> &'static str {
        "E"
    }
}

#[derive(Debug, Clone)]
struct E2(u32);
impl Event for E2 {
    fn type_name() -> &'static str {
        "E2"
    }
}

// S1 — linear pipeline: Gen() -> E(1), P(E) -> E2(x), Sink(E2).
// Run once; Sink must receive exactly [E2(1)].
#[test]
fn s1_linear_pipeline_delivers_one_event() {
    let sink_log = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&sink_log);

    let mut emitted = false;
    let gen = source(move || {
        if emitted {
            Ok(None)
        } else {
            emitted = true;
            Ok(Some(E(1)))
        }
    });
    let proc = processor(|e: E| Ok(E2(e.0)));
    let sink = processor(move |e2: E2| {
        log.lock().unwrap().push(e2.0);
        Ok(())
    });

    let app = App::new(vec![AnyBlock::source(gen), AnyBlock::processor(proc), AnyBlock::processor(sink)])
        .install_signal_handlers(false);
    app.run(RunConfig::once()).unwrap();

    assert_eq!(*sink_log.lock().unwrap(), vec![1]);
}

// S4 — fan-out order: two processors A, B both consume E, registered
// [A, B]. A single E() must invoke A strictly before B.
#[test]
fn s4_fan_out_preserves_registration_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let order_a = Arc::clone(&order);
    let order_b = Arc::clone(&order);

    let mut fired = false;
    let gen = source(move || {
        if fired {
            Ok(None)
        } else {
            fired = true;
            Ok(Some(E(0)))
        }
    });
    let a = processor(move |_: E| {
        order_a.lock().unwrap().push("A");
        Ok(())
    });
    let b = processor(move |_: E| {
        order_b.lock().unwrap().push("B");
        Ok(())
    });

    let app = App::new(vec![AnyBlock::source(gen), AnyBlock::processor(a), AnyBlock::processor(b)])
        .install_signal_handlers(false);
    app.run(RunConfig::once()).unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["A", "B"]);
}

// S5 — depth-first: Gen -> E; P1(E) -> [E2a, E2b]; P2(E2a) -> E3;
// Sink(E3), Sink2(E2b). A single tick must invoke Sink(E3) before
// Sink2(E2b), since the first branch of P1's output is fully drained
// before the second is even dispatched.
#[derive(Debug, Clone)]
struct E2a(u32);
impl Event for E2a {
    fn type_name() -> &'static str {
        "E2a"
    }
}

#[derive(Debug, Clone)]
struct E2b(u32);
impl Event for E2b {
    fn type_name() -> &'static str {
        "E2b"
    }
}

#[derive(Debug, Clone)]
struct E3(u32);
impl Event for E3 {
    fn type_name() -> &'static str {
        "E3"
    }
}

#[test]
fn s5_sync_drain_is_depth_first() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let order_sink = Arc::clone(&order);
    let order_sink2 = Arc::clone(&order);

    let mut fired = false;
    let gen = source(move || {
        if fired {
            Ok(None)
        } else {
            fired = true;
            Ok(Some(E(0)))
        }
    });
    let p1 = processor(|e: E| Ok((E2a(e.0), E2b(e.0))));
    let p2 = processor(|e: E2a| Ok(E3(e.0)));
    let sink = processor(move |_: E3| {
        order_sink.lock().unwrap().push("Sink(E3)");
        Ok(())
    });
    let sink2 = processor(move |_: E2b| {
        order_sink2.lock().unwrap().push("Sink2(E2b)");
        Ok(())
    });

    let app = App::new(vec![
        AnyBlock::source(gen),
        AnyBlock::processor(p1),
        AnyBlock::processor(p2),
        AnyBlock::processor(sink),
        AnyBlock::processor(sink2),
    ])
    .install_signal_handlers(false);
    app.run(RunConfig::once()).unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["Sink(E3)", "Sink2(E2b)"]);
}

// S6 — parallel offload: three parallel-offload processors on the
// same E, each sleeping ~30ms and returning Out(pid). Wall time should
// track the slowest single worker, not the sum, and all three Out
// events must reach the sink.
#[derive(Debug, Clone)]
struct Out(u32);
impl Event for Out {
    fn type_name() -> &'static str {
        "Out"
    }
}

#[derive(Debug, Clone)]
struct Stop;
impl Event for Stop {
    fn type_name() -> &'static str {
        "Stop"
    }
}

#[derive(EventUnion)]
enum Signal {
    E(E),
    Stop(Stop),
}

#[test]
fn s6_parallel_offload_is_concurrent_and_delivers_all_results() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let emitted_once = Arc::new(AtomicUsize::new(0));

    let collected_for_source = Arc::clone(&seen);
    let emitted_flag = Arc::clone(&emitted_once);
    let gen = source(move || {
        if emitted_flag.swap(1, Ordering::SeqCst) == 0 {
            // First poll: trigger all three offloads.
            return Ok(Some(Signal::E(E(0))));
        }
        // Every later poll just waits for the three results to land,
        // then emits the terminal event — never resubmits E.
        if collected_for_source.lock().unwrap().len() >= 3 {
            Ok(Some(Signal::Stop(Stop)))
        } else {
            Ok(None)
        }
    });

    let worker = |pid: u32| {
        parallel_processor(move |_: E| {
            std::thread::sleep(Duration::from_millis(30));
            Ok(Out(pid))
        })
    };
    let collect = Arc::clone(&seen);
    let sink = processor(move |out: Out| {
        collect.lock().unwrap().push(out.0);
        Ok(())
    });

    let app = App::new(vec![
        AnyBlock::source(gen),
        AnyBlock::processor(worker(1)),
        AnyBlock::processor(worker(2)),
        AnyBlock::processor(worker(3)),
        AnyBlock::processor(sink),
    ])
    .terminal_event::<Stop>()
    .install_signal_handlers(false);

    let started = Instant::now();
    app.run(RunConfig::with_min_interval(Duration::from_millis(5))).unwrap();
    let elapsed = started.elapsed();

    let mut pids = seen.lock().unwrap().clone();
    pids.sort();
    assert_eq!(pids, vec![1, 2, 3]);
    assert!(elapsed < Duration::from_millis(90), "parallel workers should overlap, took {elapsed:?}");
}

// Invariant 6 — once semantics + release hooks: `run(once=true)` ticks
// exactly once even with a non-empty queue, and every release hook
// runs exactly once afterward.
struct CountingSource {
    released: Arc<AtomicUsize>,
}

impl BlockingSource for CountingSource {
    type Output = E;

    fn poll(&mut self) -> anyhow::Result<E> {
        Ok(E(1))
    }

    fn release(&mut self) -> anyhow::Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct CountingProcessor {
    released: Arc<AtomicUsize>,
    invocations: Arc<AtomicUsize>,
}

impl BlockingProcessor for CountingProcessor {
    type Input = E;
    type Output = ();

    fn process(&mut self, _input: E) -> anyhow::Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) -> anyhow::Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn invariant6_once_ticks_exactly_once_and_releases_run() {
    let source_released = Arc::new(AtomicUsize::new(0));
    let processor_released = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));

    let src = CountingSource { released: Arc::clone(&source_released) };
    let proc = CountingProcessor {
        released: Arc::clone(&processor_released),
        invocations: Arc::clone(&invocations),
    };

    let app = App::new(vec![AnyBlock::source(src), AnyBlock::processor(proc)]).install_signal_handlers(false);
    app.run(RunConfig::once()).unwrap();

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(source_released.load(Ordering::SeqCst), 1);
    assert_eq!(processor_released.load(Ordering::SeqCst), 1);
}

// Invariant 8 — error containment: a processor that fails stops the
// runtime cleanly and release hooks still run exactly once.
struct FailingProcessor;
impl BlockingProcessor for FailingProcessor {
    type Input = E;
    type Output = ();

    fn process(&mut self, _input: E) -> anyhow::Result<()> {
        anyhow::bail!("boom")
    }
}

#[test]
fn invariant8_processor_error_stops_runtime_and_releases_run() {
    let source_released = Arc::new(AtomicUsize::new(0));
    let src = CountingSource { released: Arc::clone(&source_released) };

    let app = App::new(vec![AnyBlock::source(src), AnyBlock::processor(FailingProcessor)]).install_signal_handlers(false);
    let err = app.run(RunConfig::default()).unwrap_err();

    assert!(matches!(err, blockflow::RuntimeError::Block(_)));
    assert_eq!(source_released.load(Ordering::SeqCst), 1);
}
