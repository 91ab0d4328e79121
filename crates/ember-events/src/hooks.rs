use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::category::EventCategory;

/// A typed hook enumeration
///
/// The category is fixed per enum type, so a `PlayerEvent` can never be stored
/// under the `World` category by mistake.
pub trait Hook: Copy {
    /// Category every value of this enum belongs to
    const CATEGORY: EventCategory;

    /// Numeric event type as seen by scripts
    fn event_type(self) -> u32;
}

/// Player lifecycle and progression events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[repr(u32)]
pub enum PlayerEvent {
    /// Character created in the database
    CharacterCreate = 1,
    /// Character deleted from the database
    CharacterDelete = 2,
    /// Player entered the world
    Login = 3,
    /// Player left the world
    Logout = 4,
    /// First login for this character
    FirstLogin = 5,
    /// Level gained or lost
    LevelChange = 6,
    /// Money about to change, handlers may return a new amount
    MoneyChange = 7,
    /// Experience about to be granted, handlers may return a new amount
    GiveXp = 8,
    /// Reputation with a faction changed
    ReputationChange = 9,
    /// Killed another player
    KillPlayer = 10,
    /// Killed a creature
    KillCreature = 11,
}

impl PlayerEvent {
    /// Convert a script-side event id to a PlayerEvent
    pub fn from_discriminant(id: u32) -> Option<Self> {
        match id {
            1 => Some(PlayerEvent::CharacterCreate),
            2 => Some(PlayerEvent::CharacterDelete),
            3 => Some(PlayerEvent::Login),
            4 => Some(PlayerEvent::Logout),
            5 => Some(PlayerEvent::FirstLogin),
            6 => Some(PlayerEvent::LevelChange),
            7 => Some(PlayerEvent::MoneyChange),
            8 => Some(PlayerEvent::GiveXp),
            9 => Some(PlayerEvent::ReputationChange),
            10 => Some(PlayerEvent::KillPlayer),
            11 => Some(PlayerEvent::KillCreature),
            _ => None,
        }
    }

    pub fn to_discriminant(self) -> u32 {
        self as u32
    }
}

impl Hook for PlayerEvent {
    const CATEGORY: EventCategory = EventCategory::Player;

    fn event_type(self) -> u32 {
        self.to_discriminant()
    }
}

/// Server-wide world events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[repr(u32)]
pub enum WorldEvent {
    /// World update tick
    Update = 1,
    /// Configuration (re)loaded
    ConfigLoad = 2,
    /// Shutdown initiated
    ShutdownInit = 3,
    /// Shutdown cancelled
    ShutdownCancel = 4,
    /// Startup complete
    Startup = 5,
    /// Server shutting down
    Shutdown = 6,
}

impl WorldEvent {
    pub fn from_discriminant(id: u32) -> Option<Self> {
        match id {
            1 => Some(WorldEvent::Update),
            2 => Some(WorldEvent::ConfigLoad),
            3 => Some(WorldEvent::ShutdownInit),
            4 => Some(WorldEvent::ShutdownCancel),
            5 => Some(WorldEvent::Startup),
            6 => Some(WorldEvent::Shutdown),
            _ => None,
        }
    }

    pub fn to_discriminant(self) -> u32 {
        self as u32
    }
}

impl Hook for WorldEvent {
    const CATEGORY: EventCategory = EventCategory::World;

    fn event_type(self) -> u32 {
        self.to_discriminant()
    }
}

/// Lifecycle events for game objects placed in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[repr(u32)]
pub enum WorldObjectEvent {
    Create = 1,
    Destroy = 2,
    Update = 3,
    Repop = 4,
}

impl WorldObjectEvent {
    pub fn from_discriminant(id: u32) -> Option<Self> {
        match id {
            1 => Some(WorldObjectEvent::Create),
            2 => Some(WorldObjectEvent::Destroy),
            3 => Some(WorldObjectEvent::Update),
            4 => Some(WorldObjectEvent::Repop),
            _ => None,
        }
    }

    pub fn to_discriminant(self) -> u32 {
        self as u32
    }
}

impl Hook for WorldObjectEvent {
    const CATEGORY: EventCategory = EventCategory::WorldObject;

    fn event_type(self) -> u32 {
        self.to_discriminant()
    }
}

/// Creature combat and state events
///
/// Usually registered per template entry or per spawned instance rather than
/// globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[repr(u32)]
pub enum CreatureEvent {
    Heal = 1,
    Damage = 2,
    AuraApply = 3,
    AuraRemove = 4,
    PeriodicDamageTick = 5,
    MeleeDamage = 6,
    SpellDamageTaken = 7,
    HealReceived = 8,
    DealDamage = 9,
    BeforeRollMeleeOutcome = 10,
    DisplayIdChange = 11,
    EnterEvadeMode = 12,
    EnterCombat = 13,
    Death = 14,
    SetShapeshiftForm = 15,
}

impl CreatureEvent {
    pub fn from_discriminant(id: u32) -> Option<Self> {
        match id {
            1 => Some(CreatureEvent::Heal),
            2 => Some(CreatureEvent::Damage),
            3 => Some(CreatureEvent::AuraApply),
            4 => Some(CreatureEvent::AuraRemove),
            5 => Some(CreatureEvent::PeriodicDamageTick),
            6 => Some(CreatureEvent::MeleeDamage),
            7 => Some(CreatureEvent::SpellDamageTaken),
            8 => Some(CreatureEvent::HealReceived),
            9 => Some(CreatureEvent::DealDamage),
            10 => Some(CreatureEvent::BeforeRollMeleeOutcome),
            11 => Some(CreatureEvent::DisplayIdChange),
            12 => Some(CreatureEvent::EnterEvadeMode),
            13 => Some(CreatureEvent::EnterCombat),
            14 => Some(CreatureEvent::Death),
            15 => Some(CreatureEvent::SetShapeshiftForm),
            _ => None,
        }
    }

    pub fn to_discriminant(self) -> u32 {
        self as u32
    }
}

impl Hook for CreatureEvent {
    const CATEGORY: EventCategory = EventCategory::Creature;

    fn event_type(self) -> u32 {
        self.to_discriminant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_discriminants_round_trip() {
        for id in 1..=11 {
            let event = PlayerEvent::from_discriminant(id).unwrap();
            assert_eq!(event.to_discriminant(), id);
        }
        assert_eq!(PlayerEvent::from_discriminant(0), None);
        assert_eq!(PlayerEvent::from_discriminant(12), None);
    }

    #[test]
    fn test_creature_discriminants_cover_range() {
        assert_eq!(CreatureEvent::from_discriminant(14), Some(CreatureEvent::Death));
        assert_eq!(CreatureEvent::from_discriminant(16), None);
    }

    #[test]
    fn test_categories_are_fixed_per_enum() {
        assert_eq!(PlayerEvent::CATEGORY, EventCategory::Player);
        assert_eq!(WorldEvent::CATEGORY, EventCategory::World);
        assert_eq!(WorldObjectEvent::CATEGORY, EventCategory::WorldObject);
        assert_eq!(CreatureEvent::CATEGORY, EventCategory::Creature);
    }

    #[test]
    fn test_shared_numeric_types_across_enums() {
        // Same number, different families
        assert_eq!(PlayerEvent::Login.event_type(), WorldEvent::ShutdownInit.event_type());
        assert_ne!(PlayerEvent::CATEGORY, WorldEvent::CATEGORY);
    }
}
