use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Family of hook enumerations an event belongs to
///
/// Two families may reuse the same numeric event type (`PlayerEvent::Login` and
/// `WorldEvent::ShutdownInit` are both 3), so every key carries its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
pub enum EventCategory {
    Player,
    World,
    WorldObject,
    Creature,
}

impl EventCategory {
    /// All categories, in declaration order
    pub const ALL: [EventCategory; 4] = [
        EventCategory::Player,
        EventCategory::World,
        EventCategory::WorldObject,
        EventCategory::Creature,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_variant_name() {
        assert_eq!(EventCategory::Player.to_string(), "Player");
        assert_eq!(EventCategory::WorldObject.to_string(), "WorldObject");
    }

    #[test]
    fn test_all_is_distinct() {
        let mut all = EventCategory::ALL.to_vec();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), EventCategory::ALL.len());
    }
}
