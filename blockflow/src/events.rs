//! The event model (C1): an opaque typed value plus the out-of-band
//! metadata bag it may carry, and the [`Event`] trait that gives a type
//! its identity and its ancestor chain for supertype dispatch.
//!
//! An [`Envelope`] is cheap to clone (its payload and metadata are
//! `Arc`-backed) because fan-out (C4/C5) delivers the same event to
//! every processor registered for it, not just the first match.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Marker trait for a type that can travel through a [`crate::graph::Graph`].
///
/// Never implement this by hand — derive it:
///
/// ```ignore
/// #[derive(Event, Clone, Debug)]
/// struct OrderPlaced { id: u64 }
///
/// #[derive(Event, Clone, Debug)]
/// #[event(supertype(OrderPlaced))]
/// struct OrderPlacedVip { id: u64, tier: u8 }
/// ```
///
/// `ancestors()` lists supertypes most-specific first, mirroring a
/// manually-declared MRO: a processor registered on `OrderPlaced` also
/// receives `OrderPlacedVip` events, should no more specific route
/// exist. `Clone` is required because fan-out hands the same event to
/// every matching processor.
pub trait Event: Any + Send + Sync + Clone + 'static {
    fn type_name() -> &'static str
    where
        Self: Sized;

    fn ancestors() -> &'static [TypeId]
    where
        Self: Sized,
    {
        &[]
    }
}

type ExtBag = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// A type-erased event in flight, carrying its payload and an optional
/// out-of-band metadata bag (manual-ack handles, trace ids, and the
/// like) that the dispatcher never inspects.
#[derive(Clone)]
pub struct Envelope {
    type_id: TypeId,
    type_name: &'static str,
    ancestors: &'static [TypeId],
    payload: Arc<dyn Any + Send + Sync>,
    ext: Arc<ExtBag>,
    debug: fn(&(dyn Any + Send + Sync)) -> String,
}

impl Envelope {
    pub fn new<T: Event>(value: T) -> Self {
        Envelope {
            type_id: TypeId::of::<T>(),
            type_name: T::type_name(),
            ancestors: T::ancestors(),
            payload: Arc::new(value),
            ext: Arc::new(HashMap::new()),
            debug: |_| "<opaque>".to_string(),
        }
    }

    /// Like [`Envelope::new`], but records a debug formatter so the
    /// envelope can render its payload without knowing its concrete
    /// type at the call site.
    pub fn with_debug<T: Event + std::fmt::Debug>(value: T) -> Self {
        let mut envelope = Envelope::new(value);
        envelope.debug = |payload| {
            payload
                .downcast_ref::<T>()
                .map(|v| format!("{v:?}"))
                .unwrap_or_else(|| "<opaque>".to_string())
        };
        envelope
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn ancestors(&self) -> &'static [TypeId] {
        self.ancestors
    }

    pub fn is<T: Event>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Recovers an owned `T`, cloning it out of the shared payload.
    /// Returns the envelope unchanged on a type mismatch so the caller
    /// can try the next candidate route.
    pub fn downcast<T: Event>(self) -> Result<T, Envelope> {
        if self.type_id == TypeId::of::<T>() {
            Ok(self
                .payload
                .downcast_ref::<T>()
                .expect("type_id checked above")
                .clone())
        } else {
            Err(self)
        }
    }

    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn ext_insert<T: Send + Sync + 'static>(&mut self, value: T) {
        Arc::make_mut(&mut self.ext).insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn ext_get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.ext.get(&TypeId::of::<T>()).and_then(|b| b.downcast_ref::<T>())
    }

    pub fn debug_payload(&self) -> String {
        (self.debug)(self.payload.as_ref())
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("type_name", &self.type_name)
            .field("payload", &self.debug_payload())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    impl Event for Ping {
        fn type_name() -> &'static str {
            "Ping"
        }
    }

    #[test]
    fn round_trips_through_envelope() {
        let env = Envelope::with_debug(Ping(7));
        assert!(env.is::<Ping>());
        assert_eq!(env.debug_payload(), "Ping(7)");
        let back = env.downcast::<Ping>().unwrap();
        assert_eq!(back, Ping(7));
    }

    #[test]
    fn downcast_mismatch_returns_envelope() {
        #[derive(Debug, Clone)]
        struct Other;
        impl Event for Other {
            fn type_name() -> &'static str {
                "Other"
            }
        }

        let env = Envelope::new(Ping(1));
        let env = env.downcast::<Other>().unwrap_err();
        assert!(env.is::<Ping>());
    }

    #[test]
    fn ext_bag_roundtrips() {
        let mut env = Envelope::new(Ping(1));
        env.ext_insert(42usize);
        assert_eq!(env.ext_get::<usize>(), Some(&42));
        assert_eq!(env.ext_get::<u8>(), None);
    }

    #[test]
    fn clone_shares_payload_cheaply() {
        let env = Envelope::new(Ping(3));
        let clone = env.clone();
        assert_eq!(env.downcast::<Ping>().unwrap(), clone.downcast::<Ping>().unwrap());
    }
}
