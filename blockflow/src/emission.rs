//! What a source or processor may hand back to the graph (C3's output
//! side): nothing, one event, an optional event, a batch of events, a
//! fixed tuple of heterogeneous emissions, or a sum-type union produced
//! by `#[derive(EventUnion)]`.
//!
//! This is the Rust-native replacement for walking a return annotation
//! at runtime: the set of event types a function can possibly emit is
//! fixed by its return type and recoverable via [`Emission::declared_types`]
//! without looking at any value.

use std::any::TypeId;

use crate::events::{Envelope, Event};

/// A value that can become zero or more [`Envelope`]s.
pub trait Emission: Send {
    /// Every event type this emission can possibly produce, independent
    /// of any particular value. Used by the graph builder to derive a
    /// processor's/source's output type set.
    fn declared_types() -> Vec<TypeId>
    where
        Self: Sized;

    fn into_envelopes(self) -> Vec<Envelope>;
}

/// A function that emits nothing (a pure sink processor).
impl Emission for () {
    fn declared_types() -> Vec<TypeId> {
        Vec::new()
    }

    fn into_envelopes(self) -> Vec<Envelope> {
        Vec::new()
    }
}

impl<T: Event> Emission for T {
    fn declared_types() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn into_envelopes(self) -> Vec<Envelope> {
        vec![Envelope::new(self)]
    }
}

/// `None` emits nothing this call; `Some(v)` emits one event. Lets a
/// source/processor skip a tick without a separate "no event" type.
impl<T: Emission> Emission for Option<T> {
    fn declared_types() -> Vec<TypeId> {
        T::declared_types()
    }

    fn into_envelopes(self) -> Vec<Envelope> {
        match self {
            Some(v) => v.into_envelopes(),
            None => Vec::new(),
        }
    }
}

/// A batch emission: every element is pushed as its own event, in
/// order. This is the "produces a sequence" half of the single-vs-many
/// distinction the dispatcher needs when deciding push order.
impl<T: Emission> Emission for Vec<T> {
    fn declared_types() -> Vec<TypeId> {
        T::declared_types()
    }

    fn into_envelopes(self) -> Vec<Envelope> {
        self.into_iter().flat_map(Emission::into_envelopes).collect()
    }
}

macro_rules! impl_emission_tuple {
    ($($name:ident),+) => {
        impl<$($name: Emission),+> Emission for ($($name,)+) {
            fn declared_types() -> Vec<TypeId> {
                let mut types = Vec::new();
                $(types.extend($name::declared_types());)+
                types
            }

            fn into_envelopes(self) -> Vec<Envelope> {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                let mut envelopes = Vec::new();
                $(envelopes.extend($name.into_envelopes());)+
                envelopes
            }
        }
    };
}

impl_emission_tuple!(A);
impl_emission_tuple!(A, B);
impl_emission_tuple!(A, B, C);
impl_emission_tuple!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct A(u8);
    impl Event for A {
        fn type_name() -> &'static str {
            "A"
        }
    }

    #[derive(Debug, Clone)]
    struct B(u8);
    impl Event for B {
        fn type_name() -> &'static str {
            "B"
        }
    }

    #[test]
    fn option_none_emits_nothing() {
        let emission: Option<A> = None;
        assert!(emission.into_envelopes().is_empty());
    }

    #[test]
    fn vec_emits_in_order() {
        let emission = vec![A(1), A(2), A(3)];
        let envs = emission.into_envelopes();
        assert_eq!(envs.len(), 3);
        assert_eq!(envs[0].downcast_ref::<A>().unwrap().0, 1);
        assert_eq!(envs[2].downcast_ref::<A>().unwrap().0, 3);
    }

    #[test]
    fn tuple_emits_each_member() {
        let emission = (A(1), B(2));
        let types = <(A, B) as Emission>::declared_types();
        assert_eq!(types, vec![TypeId::of::<A>(), TypeId::of::<B>()]);
        let envs = emission.into_envelopes();
        assert_eq!(envs.len(), 2);
    }
}
