//! Event taxonomy and identifiers for ember
//!
//! This crate holds the types shared between the host and the scripting layer:
//! the hook enumerations a host raises, the keys handlers are stored under, the
//! identifiers handed back to scripts, and the dynamically typed values that
//! cross the script boundary.

pub mod category;
pub mod hooks;
pub mod ids;
pub mod key;
pub mod value;

pub use category::EventCategory;
pub use hooks::{CreatureEvent, Hook, PlayerEvent, WorldEvent, WorldObjectEvent};
pub use ids::{EntityId, EntityKind, HandlerId, ScheduleId, ScopeId};
pub use key::{EventKey, HandlerStore};
pub use value::{FromValue, Value};
