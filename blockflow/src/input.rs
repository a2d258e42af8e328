//! The input side of C3: recovering a processor's parameter from an
//! [`Envelope`], and declaring the set of concrete event types a
//! processor accepts. A plain `T: Event` parameter accepts exactly one
//! type; a `#[derive(EventUnion)]` enum accepts the flattened set of its
//! member types, mirroring the distilled spec's "if `T` is a sum over
//! `{A,B,...}`, the declared set is `{A,B,...}`" rule.

use std::any::TypeId;

use crate::events::{Envelope, Event};

/// A value that can be reconstructed from an [`Envelope`] whose concrete
/// type is one of [`FromEnvelope::declared_types`].
pub trait FromEnvelope: Sized {
    fn declared_types() -> Vec<TypeId>;

    /// Attempt the conversion; on mismatch the envelope is handed back
    /// unchanged so the dispatcher can try the next candidate route.
    fn try_from_envelope(envelope: Envelope) -> Result<Self, Envelope>;
}

impl<T: Event> FromEnvelope for T {
    fn declared_types() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn try_from_envelope(envelope: Envelope) -> Result<Self, Envelope> {
        envelope.downcast::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u8);
    impl Event for Ping {
        fn type_name() -> &'static str {
            "Ping"
        }
    }

    #[test]
    fn recovers_matching_type() {
        let env = Envelope::new(Ping(9));
        let ping = Ping::try_from_envelope(env).unwrap();
        assert_eq!(ping, Ping(9));
    }

    #[test]
    fn declared_types_is_single_type() {
        assert_eq!(Ping::declared_types(), vec![TypeId::of::<Ping>()]);
    }
}
