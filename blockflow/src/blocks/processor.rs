use std::any::TypeId;

use async_trait::async_trait;

use crate::blocks::{DispatchClass, Identity};
use crate::emission::Emission;
use crate::events::Envelope;
use crate::input::FromEnvelope;

/// A processor dispatched synchronously, inline on the runtime thread
/// unless [`BlockingProcessor::dispatch_class`] reports
/// [`DispatchClass::ParallelOffload`].
pub trait BlockingProcessor: Send {
    type Input: FromEnvelope;
    type Output: Emission;

    fn process(&mut self, input: Self::Input) -> anyhow::Result<Self::Output>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn dispatch_class(&self) -> DispatchClass {
        DispatchClass::Inline
    }

    fn release(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A processor dispatched cooperatively by the asynchronous runtime.
/// Never eligible for parallel offload — cooperative and parallel
/// dispatch are mutually exclusive execution models (C8/C9).
#[async_trait]
pub trait CooperativeProcessor: Send {
    type Input: FromEnvelope;
    type Output: Emission;

    async fn process(&mut self, input: Self::Input) -> anyhow::Result<Self::Output>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Object-safe facade over both processor kinds. `process_dyn` returns
/// the original envelope alongside the error on failure so the runtime
/// can log the triggering input per the error-handling design.
#[async_trait]
pub trait DynProcessor: Send {
    fn name(&self) -> &str;
    fn declared_input_types(&self) -> Vec<TypeId>;
    fn declared_output_types(&self) -> Vec<TypeId>;
    fn dispatch_class(&self) -> DispatchClass;
    fn is_cooperative(&self) -> bool;
    fn identity(&self) -> Identity;

    fn process_dyn(&mut self, envelope: Envelope) -> Result<Vec<Envelope>, (&'static str, anyhow::Error)>;
    async fn process_dyn_async(
        &mut self,
        envelope: Envelope,
    ) -> Result<Vec<Envelope>, (&'static str, anyhow::Error)>;

    fn release_dyn(&mut self) -> anyhow::Result<()>;
    async fn release_dyn_async(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
impl<P: BlockingProcessor> DynProcessor for P {
    fn name(&self) -> &str {
        BlockingProcessor::name(self)
    }

    fn declared_input_types(&self) -> Vec<TypeId> {
        P::Input::declared_types()
    }

    fn declared_output_types(&self) -> Vec<TypeId> {
        P::Output::declared_types()
    }

    fn dispatch_class(&self) -> DispatchClass {
        BlockingProcessor::dispatch_class(self)
    }

    fn is_cooperative(&self) -> bool {
        false
    }

    fn identity(&self) -> Identity {
        self as *const P as Identity
    }

    fn process_dyn(&mut self, envelope: Envelope) -> Result<Vec<Envelope>, (&'static str, anyhow::Error)> {
        let type_name = envelope.type_name();
        let input = match P::Input::try_from_envelope(envelope) {
            Ok(input) => input,
            Err(_) => return Err((type_name, anyhow::anyhow!("envelope did not match declared input type"))),
        };
        match self.process(input) {
            Ok(output) => Ok(output.into_envelopes()),
            Err(err) => Err((type_name, err)),
        }
    }

    async fn process_dyn_async(
        &mut self,
        _envelope: Envelope,
    ) -> Result<Vec<Envelope>, (&'static str, anyhow::Error)> {
        unreachable!("blocking processor dispatched through the async path")
    }

    fn release_dyn(&mut self) -> anyhow::Result<()> {
        self.release()
    }

    async fn release_dyn_async(&mut self) -> anyhow::Result<()> {
        self.release()
    }
}

/// Wraps a [`CooperativeProcessor`] so it can be stored behind
/// [`DynProcessor`] alongside blocking processors.
pub struct Cooperative<P>(pub P);

#[async_trait]
impl<P: CooperativeProcessor> DynProcessor for Cooperative<P> {
    fn name(&self) -> &str {
        CooperativeProcessor::name(&self.0)
    }

    fn declared_input_types(&self) -> Vec<TypeId> {
        P::Input::declared_types()
    }

    fn declared_output_types(&self) -> Vec<TypeId> {
        P::Output::declared_types()
    }

    fn dispatch_class(&self) -> DispatchClass {
        DispatchClass::Inline
    }

    fn is_cooperative(&self) -> bool {
        true
    }

    fn identity(&self) -> Identity {
        &self.0 as *const P as Identity
    }

    fn process_dyn(&mut self, _envelope: Envelope) -> Result<Vec<Envelope>, (&'static str, anyhow::Error)> {
        unreachable!("cooperative processor dispatched through the sync path")
    }

    async fn process_dyn_async(
        &mut self,
        envelope: Envelope,
    ) -> Result<Vec<Envelope>, (&'static str, anyhow::Error)> {
        let type_name = envelope.type_name();
        let input = match P::Input::try_from_envelope(envelope) {
            Ok(input) => input,
            Err(_) => return Err((type_name, anyhow::anyhow!("envelope did not match declared input type"))),
        };
        match self.0.process(input).await {
            Ok(output) => Ok(output.into_envelopes()),
            Err(err) => Err((type_name, err)),
        }
    }

    fn release_dyn(&mut self) -> anyhow::Result<()> {
        unreachable!("cooperative processor released through the sync path")
    }

    async fn release_dyn_async(&mut self) -> anyhow::Result<()> {
        self.0.release().await
    }
}
