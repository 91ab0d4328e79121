//! Event handler registry
//!
//! Handlers live in three stores keyed by increasingly specific scopes:
//! global, per template entry, and per unique instance. Each key owns a bucket
//! of handlers kept in registration order, which is also dispatch order.

use std::any::Any;
use std::collections::HashMap;

use ember_events::{EntityId, EventKey, FromValue, HandlerId, HandlerStore, Hook, ScopeId, Value};
use tracing::{debug, error, trace};

use crate::callback::{invoke_guarded, CallbackResult};
use crate::handler::{DeferredOp, HandlerRecord, HookContext};

type Buckets = HashMap<EventKey, Vec<HandlerRecord>>;

/// Fan-out dispatcher for script event handlers
pub struct EventRegistry {
    global: Buckets,
    entry: Buckets,
    unique: Buckets,
    next_handler_id: u64,
    deferred: Vec<DeferredOp>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            global: HashMap::new(),
            entry: HashMap::new(),
            unique: HashMap::new(),
            next_handler_id: 1,
            deferred: Vec::new(),
        }
    }

    fn buckets(&self, store: HandlerStore) -> &Buckets {
        match store {
            HandlerStore::Global => &self.global,
            HandlerStore::Entry => &self.entry,
            HandlerStore::Unique => &self.unique,
        }
    }

    fn buckets_mut(&mut self, store: HandlerStore) -> &mut Buckets {
        match store {
            HandlerStore::Global => &mut self.global,
            HandlerStore::Entry => &mut self.entry,
            HandlerStore::Unique => &mut self.unique,
        }
    }

    // ===== Registration =====

    /// Register a handler under an explicit key
    ///
    /// `shots` limits how many times the handler may run (0 = unlimited).
    pub fn register<F>(&mut self, key: EventKey, callback: F, shots: u32, scope: ScopeId) -> HandlerId
    where
        F: FnMut(&mut HookContext<'_>, &[Value]) -> CallbackResult<Option<Value>> + Send + 'static,
    {
        let id = HandlerId::from_raw(self.next_handler_id);
        self.next_handler_id += 1;

        self.insert(key, HandlerRecord::new(id, Box::new(callback), shots, scope));
        id
    }

    pub fn register_global<H, F>(&mut self, event: H, callback: F, shots: u32, scope: ScopeId) -> HandlerId
    where
        H: Hook,
        F: FnMut(&mut HookContext<'_>, &[Value]) -> CallbackResult<Option<Value>> + Send + 'static,
    {
        self.register(EventKey::global(event), callback, shots, scope)
    }

    pub fn register_entry<H, F>(
        &mut self,
        event: H,
        entry: u32,
        callback: F,
        shots: u32,
        scope: ScopeId,
    ) -> HandlerId
    where
        H: Hook,
        F: FnMut(&mut HookContext<'_>, &[Value]) -> CallbackResult<Option<Value>> + Send + 'static,
    {
        self.register(EventKey::entry(event, entry), callback, shots, scope)
    }

    pub fn register_unique<H, F>(
        &mut self,
        event: H,
        instance: EntityId,
        callback: F,
        shots: u32,
        scope: ScopeId,
    ) -> HandlerId
    where
        H: Hook,
        F: FnMut(&mut HookContext<'_>, &[Value]) -> CallbackResult<Option<Value>> + Send + 'static,
    {
        self.register(EventKey::unique(event, instance), callback, shots, scope)
    }

    fn insert(&mut self, key: EventKey, record: HandlerRecord) {
        debug!(
            target: "events",
            "Registered {} handler {} for {} (shots={}, scope={})",
            key.store(),
            record.id(),
            key,
            record.shots(),
            record.scope()
        );
        self.buckets_mut(key.store())
            .entry(key)
            .or_default()
            .push(record);
    }

    // ===== Cancellation =====

    /// Cancel one handler by id, searching every store
    pub fn cancel(&mut self, id: HandlerId) -> bool {
        for store in [HandlerStore::Global, HandlerStore::Entry, HandlerStore::Unique] {
            let buckets = self.buckets_mut(store);

            let found = buckets.iter().find_map(|(key, handlers)| {
                handlers
                    .iter()
                    .position(|h| h.id() == id)
                    .map(|pos| (*key, pos))
            });

            if let Some((key, pos)) = found {
                if let Some(handlers) = buckets.get_mut(&key) {
                    handlers.remove(pos);
                    if handlers.is_empty() {
                        buckets.remove(&key);
                    }
                }
                debug!(target: "events", "Cancelled {} handler {}", store, id);
                return true;
            }
        }

        debug!(target: "events", "Handler {} not found for cancellation", id);
        false
    }

    /// Drop every handler registered under `key`, returning how many were dropped
    pub fn cancel_key(&mut self, key: EventKey) -> usize {
        let dropped = self
            .buckets_mut(key.store())
            .remove(&key)
            .map_or(0, |handlers| handlers.len());

        if dropped > 0 {
            debug!(target: "events", "Cancelled {} handler(s) for {}", dropped, key);
        }
        dropped
    }

    pub fn cancel_global<H: Hook>(&mut self, event: H) -> usize {
        self.cancel_key(EventKey::global(event))
    }

    pub fn cancel_entry<H: Hook>(&mut self, event: H, entry: u32) -> usize {
        self.cancel_key(EventKey::entry(event, entry))
    }

    pub fn cancel_unique<H: Hook>(&mut self, event: H, instance: EntityId) -> usize {
        self.cancel_key(EventKey::unique(event, instance))
    }

    /// Remove every handler owned by `scope` across all stores
    pub fn cancel_scope(&mut self, scope: ScopeId) -> usize {
        let mut cancelled = 0;

        for buckets in [&mut self.global, &mut self.entry, &mut self.unique] {
            buckets.retain(|_, handlers| {
                let before = handlers.len();
                handlers.retain(|h| h.scope() != scope);
                cancelled += before - handlers.len();
                !handlers.is_empty()
            });
        }

        debug!(target: "events", "Cancelled {} handler(s) for scope {}", cancelled, scope);
        cancelled
    }

    /// Remove every handler in every store
    pub fn cancel_all(&mut self) -> usize {
        let total = self.len();

        self.global.clear();
        self.entry.clear();
        self.unique.clear();

        debug!(target: "events", "Cancelled all event handlers (total: {})", total);
        total
    }

    // ===== Dispatch =====

    /// Raise the event under `key`, returning how many handlers ran successfully
    pub fn trigger(&mut self, key: EventKey, args: &[Value]) -> u32 {
        self.dispatch(key, args, None, |_, _| {})
    }

    /// Like [`trigger`](Self::trigger), with `timers` reachable from handlers
    pub(crate) fn trigger_lending(
        &mut self,
        key: EventKey,
        args: &[Value],
        timers: &mut (dyn Any + 'static),
    ) -> u32 {
        self.dispatch(key, args, Some(timers), |_, _| {})
    }

    pub fn trigger_global<H: Hook>(&mut self, event: H, args: &[Value]) -> u32 {
        self.trigger(EventKey::global(event), args)
    }

    pub fn trigger_entry<H: Hook>(&mut self, event: H, entry: u32, args: &[Value]) -> u32 {
        self.trigger(EventKey::entry(event, entry), args)
    }

    pub fn trigger_unique<H: Hook>(&mut self, event: H, instance: EntityId, args: &[Value]) -> u32 {
        self.trigger(EventKey::unique(event, instance), args)
    }

    /// Raise the event and fold the values handlers hand back
    ///
    /// The last handler that returns something decodable as `T` wins. If no
    /// handler runs or none returns a usable value, `default` comes back
    /// untouched.
    pub fn trigger_with_return<T: FromValue>(&mut self, key: EventKey, default: T, args: &[Value]) -> T {
        self.fold_returns(key, default, args, None)
    }

    pub(crate) fn trigger_with_return_lending<T: FromValue>(
        &mut self,
        key: EventKey,
        default: T,
        args: &[Value],
        timers: &mut (dyn Any + 'static),
    ) -> T {
        self.fold_returns(key, default, args, Some(timers))
    }

    fn fold_returns<T: FromValue>(
        &mut self,
        key: EventKey,
        default: T,
        args: &[Value],
        timers: Option<&mut (dyn Any + 'static)>,
    ) -> T {
        let mut result = default;

        self.dispatch(key, args, timers, |id, returned| {
            let Some(value) = returned else {
                return;
            };
            if value.is_nil() {
                return;
            }
            match T::from_value(&value) {
                Some(decoded) => result = decoded,
                None => debug!(
                    target: "events",
                    "Handler {} for {} returned an unusable {} value, ignoring it",
                    id,
                    key,
                    value.type_name()
                ),
            }
        });

        result
    }

    pub fn trigger_global_with_return<H: Hook, T: FromValue>(
        &mut self,
        event: H,
        default: T,
        args: &[Value],
    ) -> T {
        self.trigger_with_return(EventKey::global(event), default, args)
    }

    pub fn trigger_entry_with_return<H: Hook, T: FromValue>(
        &mut self,
        event: H,
        entry: u32,
        default: T,
        args: &[Value],
    ) -> T {
        self.trigger_with_return(EventKey::entry(event, entry), default, args)
    }

    pub fn trigger_unique_with_return<H: Hook, T: FromValue>(
        &mut self,
        event: H,
        instance: EntityId,
        default: T,
        args: &[Value],
    ) -> T {
        self.trigger_with_return(EventKey::unique(event, instance), default, args)
    }

    /// Run every live handler in the bucket, then prune and apply deferred ops
    fn dispatch<F>(
        &mut self,
        key: EventKey,
        args: &[Value],
        mut timers: Option<&mut (dyn Any + 'static)>,
        mut on_success: F,
    ) -> u32
    where
        F: FnMut(HandlerId, Option<Value>),
    {
        let Self {
            global,
            entry,
            unique,
            next_handler_id,
            deferred,
        } = self;

        let buckets = match key.store() {
            HandlerStore::Global => global,
            HandlerStore::Entry => entry,
            HandlerStore::Unique => unique,
        };

        let Some(handlers) = buckets.get_mut(&key) else {
            trace!(target: "events", "No handlers registered for {}", key);
            return 0;
        };

        let mut executed = 0;

        for handler in handlers.iter_mut() {
            if !handler.should_execute() {
                continue;
            }
            if deferred.iter().any(|op| op.suppresses(&key, &*handler)) {
                continue;
            }

            let id = handler.id();
            let mut ctx = HookContext::new(key, id, next_handler_id, deferred, timers.as_deref_mut());
            let callback = handler.callback_mut();

            match invoke_guarded(|| callback(&mut ctx, args)) {
                Ok(returned) => {
                    handler.record_execution();
                    executed += 1;
                    on_success(id, returned);
                }
                Err(e) => {
                    error!(target: "events", "Handler {} for {} failed: {}", id, key, e);
                }
            }
        }

        let before = handlers.len();
        handlers.retain(|h| !h.is_expired());
        let pruned = before - handlers.len();
        if handlers.is_empty() {
            buckets.remove(&key);
        }
        if pruned > 0 {
            debug!(target: "events", "Pruned {} exhausted handler(s) for {}", pruned, key);
        }

        self.apply_deferred();
        executed
    }

    fn apply_deferred(&mut self) {
        if self.deferred.is_empty() {
            return;
        }

        for op in std::mem::take(&mut self.deferred) {
            match op {
                DeferredOp::Register(key, record) => self.insert(key, record),
                DeferredOp::Cancel(id) => {
                    self.cancel(id);
                }
                DeferredOp::CancelKey(key) => {
                    self.cancel_key(key);
                }
                DeferredOp::CancelScope(scope) => {
                    self.cancel_scope(scope);
                }
            }
        }
    }

    // ===== Introspection =====

    /// Number of live handlers under `key`
    pub fn handler_count(&self, key: &EventKey) -> usize {
        self.buckets(key.store()).get(key).map_or(0, Vec::len)
    }

    /// Ids under `key` in dispatch order
    pub fn handler_ids(&self, key: &EventKey) -> Vec<HandlerId> {
        self.buckets(key.store())
            .get(key)
            .map(|handlers| handlers.iter().map(HandlerRecord::id).collect())
            .unwrap_or_default()
    }

    /// Whether `key` currently has a bucket at all
    pub fn has_bucket(&self, key: &EventKey) -> bool {
        self.buckets(key.store()).contains_key(key)
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.find(id).is_some()
    }

    /// Look up a live handler's bookkeeping
    pub fn find(&self, id: HandlerId) -> Option<&HandlerRecord> {
        [&self.global, &self.entry, &self.unique]
            .into_iter()
            .flat_map(|buckets| buckets.values())
            .flatten()
            .find(|h| h.id() == id)
    }

    /// Total live handlers across every store
    pub fn len(&self) -> usize {
        [&self.global, &self.entry, &self.unique]
            .into_iter()
            .flat_map(|buckets| buckets.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}
