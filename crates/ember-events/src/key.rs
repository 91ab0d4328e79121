use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::Display;

use crate::category::EventCategory;
use crate::hooks::Hook;
use crate::ids::EntityId;

/// Which of the registry's three stores a key lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum HandlerStore {
    /// Not tied to any object
    Global,
    /// Tied to a template entry (every spawn of creature template 1234)
    Entry,
    /// Tied to one specific instance
    Unique,
}

/// Lookup key for a bucket of handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKey {
    Global {
        category: EventCategory,
        event_type: u32,
    },
    Entry {
        category: EventCategory,
        event_type: u32,
        entry: u32,
    },
    Unique {
        category: EventCategory,
        event_type: u32,
        instance: EntityId,
    },
}

impl EventKey {
    pub fn global<H: Hook>(event: H) -> Self {
        EventKey::Global {
            category: H::CATEGORY,
            event_type: event.event_type(),
        }
    }

    pub fn entry<H: Hook>(event: H, entry: u32) -> Self {
        EventKey::Entry {
            category: H::CATEGORY,
            event_type: event.event_type(),
            entry,
        }
    }

    pub fn unique<H: Hook>(event: H, instance: EntityId) -> Self {
        EventKey::Unique {
            category: H::CATEGORY,
            event_type: event.event_type(),
            instance,
        }
    }

    pub fn category(&self) -> EventCategory {
        match self {
            EventKey::Global { category, .. }
            | EventKey::Entry { category, .. }
            | EventKey::Unique { category, .. } => *category,
        }
    }

    pub fn event_type(&self) -> u32 {
        match self {
            EventKey::Global { event_type, .. }
            | EventKey::Entry { event_type, .. }
            | EventKey::Unique { event_type, .. } => *event_type,
        }
    }

    pub fn store(&self) -> HandlerStore {
        match self {
            EventKey::Global { .. } => HandlerStore::Global,
            EventKey::Entry { .. } => HandlerStore::Entry,
            EventKey::Unique { .. } => HandlerStore::Unique,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Global {
                category,
                event_type,
            } => write!(f, "{}:{}", category, event_type),
            EventKey::Entry {
                category,
                event_type,
                entry,
            } => write!(f, "{}:{}@entry {}", category, event_type, entry),
            EventKey::Unique {
                category,
                event_type,
                instance,
            } => write!(f, "{}:{}@{}", category, event_type, instance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{CreatureEvent, PlayerEvent, WorldEvent};
    use std::collections::HashSet;

    #[test]
    fn test_same_type_different_category_are_distinct_keys() {
        let player = EventKey::global(PlayerEvent::Login);
        let world = EventKey::global(WorldEvent::ShutdownInit);
        assert_eq!(player.event_type(), world.event_type());
        assert_ne!(player, world);

        let set: HashSet<_> = [player, world].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_store_follows_variant() {
        assert_eq!(EventKey::global(PlayerEvent::Login).store(), HandlerStore::Global);
        assert_eq!(EventKey::entry(CreatureEvent::Death, 1234).store(), HandlerStore::Entry);
        assert_eq!(
            EventKey::unique(CreatureEvent::Death, EntityId::new(5)).store(),
            HandlerStore::Unique
        );
    }

    #[test]
    fn test_entry_keys_differ_by_template() {
        assert_ne!(
            EventKey::entry(CreatureEvent::EnterCombat, 1),
            EventKey::entry(CreatureEvent::EnterCombat, 2)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(EventKey::global(PlayerEvent::Login).to_string(), "Player:3");
        assert_eq!(
            EventKey::entry(CreatureEvent::Death, 1234).to_string(),
            "Creature:14@entry 1234"
        );
        assert_eq!(HandlerStore::Unique.to_string(), "unique");
    }
}
