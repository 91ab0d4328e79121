use ember_events::{EntityId, EntityKind};

/// Looks up the live host object behind an entity id
///
/// Consulted each time an entity-bound timer fires, never cached, since the
/// object may have been moved or replaced since the timer was scheduled.
/// Returning `None` skips that firing.
pub trait EntityResolver<E> {
    fn resolve(&self, id: EntityId, kind: EntityKind) -> Option<E>;
}

impl<E, F> EntityResolver<E> for F
where
    F: Fn(EntityId, EntityKind) -> Option<E>,
{
    fn resolve(&self, id: EntityId, kind: EntityKind) -> Option<E> {
        self(id, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyCreatures;

    impl EntityResolver<u64> for OnlyCreatures {
        fn resolve(&self, id: EntityId, kind: EntityKind) -> Option<u64> {
            (kind == EntityKind::Creature).then(|| id.as_u64())
        }
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |id: EntityId, _kind: EntityKind| Some(id.as_u64() * 2);
        assert_eq!(resolver.resolve(EntityId::new(4), EntityKind::Player), Some(8));
    }

    #[test]
    fn test_struct_resolver() {
        assert_eq!(OnlyCreatures.resolve(EntityId::new(3), EntityKind::Creature), Some(3));
        assert_eq!(OnlyCreatures.resolve(EntityId::new(3), EntityKind::GameObject), None);
    }
}
