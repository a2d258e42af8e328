use std::any::TypeId;

use async_trait::async_trait;

use crate::blocks::Identity;
use crate::emission::Emission;
use crate::events::Envelope;

/// A source polled synchronously on the runtime's own thread, once per
/// tick. Its output type set is derived entirely from `Output`.
pub trait BlockingSource: Send {
    type Output: Emission;

    fn poll(&mut self) -> anyhow::Result<Self::Output>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once, in registration order, during shutdown.
    fn release(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A source polled cooperatively: many cooperative sources are polled
/// concurrently by the asynchronous runtime (C8), each as its own task.
#[async_trait]
pub trait CooperativeSource: Send {
    type Output: Emission;

    async fn poll(&mut self) -> anyhow::Result<Self::Output>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Object-safe facade over [`BlockingSource`], automatically
/// implemented for every type that implements it. The graph and
/// runtime only ever hold `Box<dyn DynSource>`.
#[async_trait]
pub trait DynSource: Send {
    fn name(&self) -> &str;
    fn declared_output_types(&self) -> Vec<TypeId>;
    fn identity(&self) -> Identity;

    /// `true` for a [`CooperativeSource`] wrapped through this facade;
    /// the sync runtime rejects a graph containing one.
    fn is_cooperative(&self) -> bool;

    fn poll_dyn(&mut self) -> anyhow::Result<Vec<Envelope>>;
    async fn poll_dyn_async(&mut self) -> anyhow::Result<Vec<Envelope>>;

    fn release_dyn(&mut self) -> anyhow::Result<()>;
    async fn release_dyn_async(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
impl<S: BlockingSource> DynSource for S {
    fn name(&self) -> &str {
        BlockingSource::name(self)
    }

    fn declared_output_types(&self) -> Vec<TypeId> {
        S::Output::declared_types()
    }

    fn identity(&self) -> Identity {
        self as *const S as Identity
    }

    fn is_cooperative(&self) -> bool {
        false
    }

    fn poll_dyn(&mut self) -> anyhow::Result<Vec<Envelope>> {
        Ok(self.poll()?.into_envelopes())
    }

    async fn poll_dyn_async(&mut self) -> anyhow::Result<Vec<Envelope>> {
        unreachable!("blocking source polled through the async path")
    }

    fn release_dyn(&mut self) -> anyhow::Result<()> {
        self.release()
    }

    async fn release_dyn_async(&mut self) -> anyhow::Result<()> {
        self.release()
    }
}

/// Wraps a [`CooperativeSource`] so it can also be stored behind
/// [`DynSource`] — the asynchronous runtime is the only caller that
/// exercises the `_async` half of the facade.
pub struct Cooperative<S>(pub S);

#[async_trait]
impl<S: CooperativeSource> DynSource for Cooperative<S> {
    fn name(&self) -> &str {
        CooperativeSource::name(&self.0)
    }

    fn declared_output_types(&self) -> Vec<TypeId> {
        S::Output::declared_types()
    }

    fn identity(&self) -> Identity {
        &self.0 as *const S as Identity
    }

    fn is_cooperative(&self) -> bool {
        true
    }

    fn poll_dyn(&mut self) -> anyhow::Result<Vec<Envelope>> {
        unreachable!("cooperative source polled through the sync path")
    }

    async fn poll_dyn_async(&mut self) -> anyhow::Result<Vec<Envelope>> {
        Ok(self.0.poll().await?.into_envelopes())
    }

    fn release_dyn(&mut self) -> anyhow::Result<()> {
        unreachable!("cooperative source released through the sync path")
    }

    async fn release_dyn_async(&mut self) -> anyhow::Result<()> {
        self.0.release().await
    }
}
