use std::collections::HashMap;

use ember_scripting_host::{EntityId, EntityKind, EntityResolver};

/// A creature as handed to entity-bound timers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creature {
    pub id: EntityId,
    pub entry: u32,
    pub name: String,
    pub health: u32,
}

/// Tiny in-memory stand-in for a game world
#[derive(Debug, Default)]
pub struct World {
    creatures: HashMap<EntityId, Creature>,
    next_guid: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entry: u32, name: &str, health: u32) -> EntityId {
        self.next_guid += 1;
        let id = EntityId::new(0xF130_0000_0000_0000 | self.next_guid);
        self.creatures.insert(
            id,
            Creature {
                id,
                entry,
                name: name.to_string(),
                health,
            },
        );
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Creature> {
        self.creatures.remove(&id)
    }

    /// Apply damage, returning the health left
    pub fn damage(&mut self, id: EntityId, amount: u32) -> Option<u32> {
        let creature = self.creatures.get_mut(&id)?;
        creature.health = creature.health.saturating_sub(amount);
        Some(creature.health)
    }

    pub fn creature_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.creatures.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }
}

impl EntityResolver<Creature> for World {
    fn resolve(&self, id: EntityId, kind: EntityKind) -> Option<Creature> {
        if kind != EntityKind::Creature {
            return None;
        }
        self.creatures.get(&id).cloned()
    }
}
