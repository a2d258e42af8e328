//! A three-block linear pipeline: a generator emits one `E`, a
//! processor turns it into an `E2`, and a sink prints what it
//! received. Run once (spec.md §8's S1: `Gen() -> E(1)`,
//! `P(E) -> E2(x)`, `Sink(E2)`, expect `Sink` sees exactly `[E2(1)]`).

use blockflow::prelude::*;

#[derive(Event, Clone, Debug)]
struct E(u32);

#[derive(Event, Clone, Debug)]
struct E2(u32);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

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

    let sink = processor(|e2: E2| {
        println!("sink received {e2:?}");
        Ok(())
    });

    let app = App::new(vec![AnyBlock::source(gen), AnyBlock::processor(proc), AnyBlock::processor(sink)])
        .install_signal_handlers(false);

    app.run(RunConfig::once())?;
    Ok(())
}
