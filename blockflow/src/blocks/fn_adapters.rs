//! Function-wrapper builders — the Rust-native stand-in for the
//! original library's `@source`/`@processor`/`@parallel_processor`/
//! `@async_source`/`@async_processor` decorators. A plain `fn`/closure
//! becomes a block simply by being passed to the matching constructor;
//! its input/output type sets fall out of the closure's concrete
//! signature via [`crate::emission::Emission`]/[`crate::input::FromEnvelope`].

use async_trait::async_trait;
use std::future::Future;

use crate::blocks::processor::{BlockingProcessor, CooperativeProcessor};
use crate::blocks::source::{BlockingSource, CooperativeSource};
use crate::blocks::DispatchClass;
use crate::emission::Emission;
use crate::input::FromEnvelope;

/// Wraps `FnMut() -> anyhow::Result<O>` as a [`BlockingSource`].
pub struct FnSource<F> {
    name: &'static str,
    f: F,
}

impl<F, O> BlockingSource for FnSource<F>
where
    F: FnMut() -> anyhow::Result<O> + Send,
    O: Emission,
{
    type Output = O;

    fn poll(&mut self) -> anyhow::Result<O> {
        (self.f)()
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub fn source<F, O>(f: F) -> FnSource<F>
where
    F: FnMut() -> anyhow::Result<O> + Send,
    O: Emission,
{
    FnSource { name: std::any::type_name::<F>(), f }
}

/// Wraps `FnMut(I) -> anyhow::Result<O>` as a [`BlockingProcessor`]
/// with [`DispatchClass::Inline`].
pub struct FnProcessor<F> {
    name: &'static str,
    f: F,
    dispatch_class: DispatchClass,
}

impl<F, I, O> BlockingProcessor for FnProcessor<F>
where
    F: FnMut(I) -> anyhow::Result<O> + Send,
    I: FromEnvelope,
    O: Emission,
{
    type Input = I;
    type Output = O;

    fn process(&mut self, input: I) -> anyhow::Result<O> {
        (self.f)(input)
    }

    fn name(&self) -> &str {
        self.name
    }

    fn dispatch_class(&self) -> DispatchClass {
        self.dispatch_class
    }
}

pub fn processor<F, I, O>(f: F) -> FnProcessor<F>
where
    F: FnMut(I) -> anyhow::Result<O> + Send,
    I: FromEnvelope,
    O: Emission,
{
    FnProcessor {
        name: std::any::type_name::<F>(),
        f,
        dispatch_class: DispatchClass::Inline,
    }
}

/// Same contract as [`processor`], but the resulting block is marked
/// [`DispatchClass::ParallelOffload`] — the graph builder routes its
/// dispatch through the worker pool (C9) instead of inline.
pub fn parallel_processor<F, I, O>(f: F) -> FnProcessor<F>
where
    F: FnMut(I) -> anyhow::Result<O> + Send,
    I: FromEnvelope,
    O: Emission,
{
    FnProcessor {
        name: std::any::type_name::<F>(),
        f,
        dispatch_class: DispatchClass::ParallelOffload,
    }
}

/// Wraps an async closure/future-returning function as a
/// [`CooperativeSource`].
pub struct FnAsyncSource<F> {
    name: &'static str,
    f: F,
}

#[async_trait]
impl<F, Fut, O> CooperativeSource for FnAsyncSource<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = anyhow::Result<O>> + Send,
    O: Emission,
{
    type Output = O;

    async fn poll(&mut self) -> anyhow::Result<O> {
        (self.f)().await
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub fn async_source<F, Fut, O>(f: F) -> FnAsyncSource<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = anyhow::Result<O>> + Send,
    O: Emission,
{
    FnAsyncSource { name: std::any::type_name::<F>(), f }
}

/// Wraps an async closure/future-returning function as a
/// [`CooperativeProcessor`].
pub struct FnAsyncProcessor<F> {
    name: &'static str,
    f: F,
}

#[async_trait]
impl<F, Fut, I, O> CooperativeProcessor for FnAsyncProcessor<F>
where
    F: FnMut(I) -> Fut + Send,
    Fut: Future<Output = anyhow::Result<O>> + Send,
    I: FromEnvelope + Send,
    O: Emission,
{
    type Input = I;
    type Output = O;

    async fn process(&mut self, input: I) -> anyhow::Result<O> {
        (self.f)(input).await
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub fn async_processor<F, Fut, I, O>(f: F) -> FnAsyncProcessor<F>
where
    F: FnMut(I) -> Fut + Send,
    Fut: Future<Output = anyhow::Result<O>> + Send,
    I: FromEnvelope + Send,
    O: Emission,
{
    FnAsyncProcessor { name: std::any::type_name::<F>(), f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;

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
    fn fn_source_polls_closure() {
        let mut n = 0;
        let mut src = source(move || {
            n += 1;
            Ok(Tick(n))
        });
        assert_eq!(src.poll().unwrap().0, 1);
        assert_eq!(src.poll().unwrap().0, 2);
    }

    #[test]
    fn fn_processor_runs_closure() {
        let mut proc = processor(|t: Tick| Ok(Doubled(t.0 * 2)));
        let out = proc.process(Tick(21)).unwrap();
        assert_eq!(out.0, 42);
    }

    #[test]
    fn parallel_processor_is_marked() {
        let proc = parallel_processor(|t: Tick| Ok(Doubled(t.0 * 2)));
        assert_eq!(proc.dispatch_class(), DispatchClass::ParallelOffload);
    }
}
