//! Host runtime for script event hooks and timed callbacks
//!
//! The host raises events through an [`EventRegistry`] and advances time on a
//! [`TimedScheduler`]; both are owned by an [`EngineContext`] that is passed
//! explicitly to every call site. Script callbacks are plain closures; a
//! callback that errors or panics is logged and skipped without disturbing
//! its siblings.

pub mod callback;
pub mod context;
pub mod entity;
pub mod handler;
pub mod registry;
pub mod timer;

pub use callback::{CallbackError, CallbackResult};
pub use context::{EngineContext, EngineOptions, UpdateStats};
pub use entity::EntityResolver;
pub use handler::{HandlerRecord, HookCallback, HookContext};
pub use registry::EventRegistry;
pub use timer::{EntityBinding, ScheduledRecord, TimedScheduler, TimerCallback, TimerContext, TimerFire};

// Taxonomy types callers need alongside the registry
pub use ember_events::{
    EntityId, EntityKind, EventCategory, EventKey, FromValue, HandlerId, Hook, ScheduleId, ScopeId, Value,
};
