//! A source that emits `E, E, TerminalEvent, E` across four ticks,
//! one event per tick, run with `min_interval = 0` (spec.md §8's S3).
//! The queue intercepts the terminal event on the third tick and the
//! run loop exits before the fourth `E` is ever polled — at most two
//! `E` events reach the sink.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use blockflow::prelude::*;

#[derive(Event, Clone, Debug)]
struct E;

#[derive(Event, Clone, Debug)]
struct Terminal;

#[derive(EventUnion)]
enum Out {
    E(E),
    Terminal(Terminal),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let received = Arc::new(AtomicUsize::new(0));
    let sink_received = Arc::clone(&received);

    let mut tick = 0u32;
    let gen = source(move || {
        tick += 1;
        match tick {
            3 => Ok(Out::Terminal(Terminal)),
            _ => Ok(Out::E(E)),
        }
    });

    let sink = processor(move |_: E| {
        sink_received.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let app = App::new(vec![AnyBlock::source(gen), AnyBlock::processor(sink)])
        .terminal_event::<Terminal>()
        .install_signal_handlers(false);

    app.run(RunConfig::default())?;

    let count = received.load(Ordering::SeqCst);
    println!("E events delivered to sink: {count}");
    assert!(count <= 2, "expected at most two E events before the terminal stop, got {count}");
    Ok(())
}
