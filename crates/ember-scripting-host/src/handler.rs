use std::any::Any;
use std::fmt;

use ember_events::{EventKey, HandlerId, ScopeId, Value};

use crate::callback::CallbackResult;
use crate::timer::TimedScheduler;

/// Boxed event handler callback
///
/// Receives the dispatch context and the arguments the host raised the event
/// with. `Ok(Some(value))` hands a value back for aggregation.
pub type HookCallback =
    Box<dyn FnMut(&mut HookContext<'_>, &[Value]) -> CallbackResult<Option<Value>> + Send>;

/// One registered handler with its shot bookkeeping
pub struct HandlerRecord {
    id: HandlerId,
    callback: HookCallback,
    shots: u32,
    call_count: u32,
    scope: ScopeId,
}

impl HandlerRecord {
    pub(crate) fn new(id: HandlerId, callback: HookCallback, shots: u32, scope: ScopeId) -> Self {
        Self {
            id,
            callback,
            shots,
            call_count: 0,
            scope,
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Execution limit, 0 meaning unlimited
    pub fn shots(&self) -> u32 {
        self.shots
    }

    /// Successful executions so far
    pub fn call_count(&self) -> u32 {
        self.call_count
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn should_execute(&self) -> bool {
        self.shots == 0 || self.call_count < self.shots
    }

    pub fn is_expired(&self) -> bool {
        self.shots > 0 && self.call_count >= self.shots
    }

    pub(crate) fn callback_mut(&mut self) -> &mut HookCallback {
        &mut self.callback
    }

    pub(crate) fn record_execution(&mut self) {
        self.call_count = self.call_count.saturating_add(1);
    }
}

impl fmt::Debug for HandlerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("id", &self.id)
            .field("shots", &self.shots)
            .field("call_count", &self.call_count)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Structural change requested by a handler while a trigger is running
pub(crate) enum DeferredOp {
    Register(EventKey, HandlerRecord),
    Cancel(HandlerId),
    CancelKey(EventKey),
    CancelScope(ScopeId),
}

impl DeferredOp {
    /// Whether this pending op already rules out running `record` under `key`
    pub(crate) fn suppresses(&self, key: &EventKey, record: &HandlerRecord) -> bool {
        match self {
            DeferredOp::Register(..) => false,
            DeferredOp::Cancel(id) => *id == record.id,
            DeferredOp::CancelKey(k) => k == key,
            DeferredOp::CancelScope(scope) => *scope == record.scope,
        }
    }
}

/// Context handed to a handler while it runs
///
/// Registrations and cancellations made through the context are queued and
/// applied once the current trigger finishes. Handlers cancelled this way are
/// not invoked for the rest of the running trigger; handlers registered this
/// way first run on the next trigger.
///
/// When the event is raised through an [`EngineContext`](crate::EngineContext)
/// the engine's scheduler is reachable through [`scheduler`](Self::scheduler).
pub struct HookContext<'a> {
    key: EventKey,
    handler: HandlerId,
    next_id: &'a mut u64,
    deferred: &'a mut Vec<DeferredOp>,
    timers: Option<&'a mut (dyn Any + 'static)>,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        key: EventKey,
        handler: HandlerId,
        next_id: &'a mut u64,
        deferred: &'a mut Vec<DeferredOp>,
        timers: Option<&'a mut (dyn Any + 'static)>,
    ) -> Self {
        Self {
            key,
            handler,
            next_id,
            deferred,
            timers,
        }
    }

    /// Key of the event being dispatched
    pub fn key(&self) -> EventKey {
        self.key
    }

    /// Id of the handler currently running
    pub fn handler_id(&self) -> HandlerId {
        self.handler
    }

    /// Register a new handler; the id is valid immediately
    pub fn register<F>(&mut self, key: EventKey, callback: F, shots: u32, scope: ScopeId) -> HandlerId
    where
        F: FnMut(&mut HookContext<'_>, &[Value]) -> CallbackResult<Option<Value>> + Send + 'static,
    {
        let id = HandlerId::from_raw(*self.next_id);
        *self.next_id += 1;
        self.deferred.push(DeferredOp::Register(
            key,
            HandlerRecord::new(id, Box::new(callback), shots, scope),
        ));
        id
    }

    pub fn cancel(&mut self, id: HandlerId) {
        self.deferred.push(DeferredOp::Cancel(id));
    }

    /// Cancel the handler that is currently running
    pub fn cancel_self(&mut self) {
        let id = self.handler;
        self.cancel(id);
    }

    pub fn cancel_key(&mut self, key: EventKey) {
        self.deferred.push(DeferredOp::CancelKey(key));
    }

    pub fn cancel_scope(&mut self, scope: ScopeId) {
        self.deferred.push(DeferredOp::CancelScope(scope));
    }

    /// The engine's scheduler, for scheduling or removing timers from a handler
    ///
    /// Changes made here apply immediately. `None` when the event was raised
    /// on a bare [`EventRegistry`](crate::EventRegistry), from inside a timer
    /// callback, or when `E` is not the engine's entity type.
    pub fn scheduler<E: 'static>(&mut self) -> Option<&mut TimedScheduler<E>> {
        self.timers.as_deref_mut()?.downcast_mut::<TimedScheduler<E>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_events::PlayerEvent;

    fn noop() -> HookCallback {
        Box::new(|_, _| Ok(None))
    }

    #[test]
    fn test_unlimited_handler_never_expires() {
        let mut record = HandlerRecord::new(HandlerId::from_raw(1), noop(), 0, ScopeId::MASTER);
        for _ in 0..100 {
            assert!(record.should_execute());
            record.record_execution();
        }
        assert!(!record.is_expired());
    }

    #[test]
    fn test_shot_limit_expires_handler() {
        let mut record = HandlerRecord::new(HandlerId::from_raw(1), noop(), 2, ScopeId::MASTER);
        record.record_execution();
        assert!(record.should_execute());
        assert!(!record.is_expired());
        record.record_execution();
        assert!(!record.should_execute());
        assert!(record.is_expired());
    }

    #[test]
    fn test_context_allocates_ids_eagerly() {
        let mut next_id = 10;
        let mut deferred = Vec::new();
        let key = EventKey::global(PlayerEvent::Login);
        let mut ctx = HookContext::new(key, HandlerId::from_raw(1), &mut next_id, &mut deferred, None);

        let first = ctx.register(key, |_, _| Ok(None), 0, ScopeId::MASTER);
        let second = ctx.register(key, |_, _| Ok(None), 0, ScopeId::MASTER);
        ctx.cancel_self();

        assert_eq!(first.as_u64(), 10);
        assert_eq!(second.as_u64(), 11);
        assert_eq!(next_id, 12);
        assert_eq!(deferred.len(), 3);
    }

    #[test]
    fn test_scheduler_is_reachable_only_when_lent() {
        let mut next_id = 1;
        let mut deferred = Vec::new();
        let key = EventKey::global(PlayerEvent::Login);

        let mut bare = HookContext::new(key, HandlerId::from_raw(1), &mut next_id, &mut deferred, None);
        assert!(bare.scheduler::<u64>().is_none());

        let mut scheduler: TimedScheduler<u64> = TimedScheduler::new();
        let mut ctx = HookContext::new(
            key,
            HandlerId::from_raw(1),
            &mut next_id,
            &mut deferred,
            Some(&mut scheduler),
        );
        // Wrong entity type
        assert!(ctx.scheduler::<String>().is_none());

        let scheduled = ctx
            .scheduler::<u64>()
            .map(|timers| timers.schedule_global(|_, _| Ok(()), 100, 1));
        assert!(scheduled.is_some());
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_suppression_rules() {
        let key = EventKey::global(PlayerEvent::Login);
        let other = EventKey::global(PlayerEvent::Logout);
        let record = HandlerRecord::new(HandlerId::from_raw(4), noop(), 0, ScopeId::new(2));

        assert!(DeferredOp::Cancel(HandlerId::from_raw(4)).suppresses(&key, &record));
        assert!(!DeferredOp::Cancel(HandlerId::from_raw(5)).suppresses(&key, &record));
        assert!(DeferredOp::CancelKey(key).suppresses(&key, &record));
        assert!(!DeferredOp::CancelKey(other).suppresses(&key, &record));
        assert!(DeferredOp::CancelScope(ScopeId::new(2)).suppresses(&key, &record));
        assert!(!DeferredOp::CancelScope(ScopeId::MASTER).suppresses(&key, &record));
    }
}
