use std::any::TypeId;
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::events::Envelope;

/// Maps a concrete event type to the processors registered for it,
/// walking the event's ancestor chain (most-specific first) when no
/// processor is registered for the exact type. The walk result is
/// memoized per concrete type so repeat dispatch of the same event type
/// is a single hash lookup (C5).
pub struct DispatchTable {
    routing: HashMap<TypeId, Vec<usize>>,
    cache: RwLock<HashMap<TypeId, Option<TypeId>>>,
}

impl DispatchTable {
    pub fn new(routing: HashMap<TypeId, Vec<usize>>) -> Self {
        DispatchTable {
            routing,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the processor indices registered for `envelope`'s type,
    /// or for the nearest registered ancestor. `None` means no
    /// processor in the graph can handle this event at all.
    pub fn resolve(&self, envelope: &Envelope) -> Option<&[usize]> {
        let concrete = envelope.type_id();

        if let Some(cached_key) = self.cache.read().get(&concrete).copied() {
            return cached_key.map(|key| self.routing[&key].as_slice());
        }

        let resolved_key = if self.routing.contains_key(&concrete) {
            Some(concrete)
        } else {
            envelope
                .ancestors()
                .iter()
                .find(|ancestor| self.routing.contains_key(ancestor))
                .copied()
        };

        self.cache.write().insert(concrete, resolved_key);
        resolved_key.map(|key| self.routing[&key].as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use std::any::TypeId;

    #[derive(Debug, Clone)]
    struct Base;
    impl Event for Base {
        fn type_name() -> &'static str {
            "Base"
        }
    }

    #[derive(Debug, Clone)]
    struct Derived;
    impl Event for Derived {
        fn type_name() -> &'static str {
            "Derived"
        }
        fn ancestors() -> &'static [TypeId] {
            // Hand-written lazy-init chain, standing in for what
            // `#[derive(Event)]` generates from `#[event(supertype(Base))]`.
            static CHAIN: std::sync::OnceLock<Vec<TypeId>> = std::sync::OnceLock::new();
            CHAIN.get_or_init(|| vec![TypeId::of::<Base>()])
        }
    }

    #[test]
    fn exact_match_resolves_without_ancestor_walk() {
        let mut routing = HashMap::new();
        routing.insert(TypeId::of::<Base>(), vec![0usize]);
        let table = DispatchTable::new(routing);
        let env = Envelope::new(Base);
        assert_eq!(table.resolve(&env), Some(&[0usize][..]));
    }

    #[test]
    fn unregistered_type_resolves_to_none() {
        let table = DispatchTable::new(HashMap::new());
        let env = Envelope::new(Derived);
        assert_eq!(table.resolve(&env), None);
    }

    #[test]
    fn subtype_falls_back_to_registered_ancestor() {
        let mut routing = HashMap::new();
        routing.insert(TypeId::of::<Base>(), vec![0usize]);
        let table = DispatchTable::new(routing);
        let env = Envelope::new(Derived);
        assert_eq!(table.resolve(&env), Some(&[0usize][..]));
        // Resolved once via the ancestor walk, memoized under `Derived`'s
        // own concrete type directly now.
        assert_eq!(table.cache.read().get(&TypeId::of::<Derived>()), Some(&Some(TypeId::of::<Base>())));
    }

    #[test]
    fn repeated_resolve_uses_cache() {
        let mut routing = HashMap::new();
        routing.insert(TypeId::of::<Base>(), vec![3usize]);
        let table = DispatchTable::new(routing);
        let env1 = Envelope::new(Base);
        let env2 = Envelope::new(Base);
        assert_eq!(table.resolve(&env1), Some(&[3usize][..]));
        assert_eq!(table.resolve(&env2), Some(&[3usize][..]));
        assert_eq!(table.cache.read().len(), 1);
    }
}
