//! Tick-driven timed callbacks
//!
//! Records are either global or bound to an entity. Time only moves when the
//! host calls [`TimedScheduler::tick`] / [`TimedScheduler::tick_entity`] with
//! the milliseconds elapsed since its previous step.

use std::collections::HashMap;
use std::fmt;

use ember_events::{EntityId, EntityKind, ScheduleId};
use tracing::{debug, error, trace};

use crate::callback::{invoke_guarded, CallbackResult};
use crate::entity::EntityResolver;
use crate::registry::EventRegistry;

/// What a firing callback is told about its record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFire {
    pub id: ScheduleId,
    pub delay_ms: u32,
    /// Repeat count as scheduled, 0 meaning forever
    pub repeats: u32,
}

/// Boxed timer callback; the target is `Some` only for entity-bound records
pub type TimerCallback<E> =
    Box<dyn FnMut(&mut TimerContext<'_, E>, &TimerFire, Option<&E>) -> CallbackResult<()> + Send>;

fn boxed<E, F>(f: F) -> TimerCallback<E>
where
    F: FnMut(&mut TimerContext<'_, E>, &TimerFire, Option<&E>) -> CallbackResult<()> + Send + 'static,
{
    Box::new(f)
}

fn wrap_global<E, F>(mut f: F) -> TimerCallback<E>
where
    E: 'static,
    F: FnMut(&mut TimerContext<'_, E>, &TimerFire) -> CallbackResult<()> + Send + 'static,
{
    boxed(move |ctx, fire, _| f(ctx, fire))
}

fn wrap_entity<E, F>(mut f: F) -> TimerCallback<E>
where
    E: 'static,
    F: FnMut(&mut TimerContext<'_, E>, &TimerFire, &E) -> CallbackResult<()> + Send + 'static,
{
    boxed(move |ctx, fire, target| match target {
        Some(target) => f(ctx, fire, target),
        None => Ok(()),
    })
}

/// Entity a record is tied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityBinding {
    pub entity: EntityId,
    pub kind: EntityKind,
}

/// A scheduled callback with its delay and repeat bookkeeping
pub struct ScheduledRecord<E> {
    id: ScheduleId,
    callback: TimerCallback<E>,
    delay_ms: u32,
    repeats: u32,
    remaining: u32,
    elapsed_ms: u32,
    binding: Option<EntityBinding>,
}

impl<E> ScheduledRecord<E> {
    fn new(
        id: ScheduleId,
        callback: TimerCallback<E>,
        delay_ms: u32,
        repeats: u32,
        binding: Option<EntityBinding>,
    ) -> Self {
        Self {
            id,
            callback,
            delay_ms,
            repeats,
            remaining: repeats,
            elapsed_ms: 0,
            binding,
        }
    }

    pub fn id(&self) -> ScheduleId {
        self.id
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Total repeats as scheduled, 0 meaning forever
    pub fn repeats(&self) -> u32 {
        self.repeats
    }

    /// Firings left before removal; meaningless for infinite records
    pub fn remaining_repeats(&self) -> u32 {
        self.remaining
    }

    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn binding(&self) -> Option<EntityBinding> {
        self.binding
    }

    pub fn is_global(&self) -> bool {
        self.binding.is_none()
    }

    fn fire_info(&self) -> TimerFire {
        TimerFire {
            id: self.id,
            delay_ms: self.delay_ms,
            repeats: self.repeats,
        }
    }

    /// Reset elapsed time after a firing; true once the last repeat is used up
    fn rearm(&mut self) -> bool {
        self.elapsed_ms = 0;
        if self.repeats == 0 {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

impl<E> fmt::Debug for ScheduledRecord<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledRecord")
            .field("id", &self.id)
            .field("delay_ms", &self.delay_ms)
            .field("repeats", &self.repeats)
            .field("remaining", &self.remaining)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

enum TimerOp<E> {
    Schedule(ScheduledRecord<E>),
    Remove(ScheduleId),
    RemoveAllForEntity(EntityId),
    RemoveAllGlobal,
}

impl<E> TimerOp<E> {
    fn suppresses(&self, record: &ScheduledRecord<E>) -> bool {
        match self {
            TimerOp::Schedule(_) => false,
            TimerOp::Remove(id) => *id == record.id,
            TimerOp::RemoveAllForEntity(entity) => {
                record.binding.is_some_and(|b| b.entity == *entity)
            }
            TimerOp::RemoveAllGlobal => record.is_global(),
        }
    }
}

/// Context handed to a timer callback while it fires
///
/// Changes requested here are applied once the running tick finishes. Records
/// removed through the context do not fire again during that tick.
///
/// During [`EngineContext::update`](crate::EngineContext::update) the engine's
/// event registry is reachable through [`registry`](Self::registry).
pub struct TimerContext<'a, E> {
    current: TimerFire,
    next_id: &'a mut u64,
    deferred: &'a mut Vec<TimerOp<E>>,
    registry: Option<&'a mut EventRegistry>,
}

impl<'a, E: 'static> TimerContext<'a, E> {
    fn new(
        current: TimerFire,
        next_id: &'a mut u64,
        deferred: &'a mut Vec<TimerOp<E>>,
        registry: Option<&'a mut EventRegistry>,
    ) -> Self {
        Self {
            current,
            next_id,
            deferred,
            registry,
        }
    }

    /// The engine's event registry, for registering, cancelling or raising
    /// events from a timer
    ///
    /// Changes made here apply immediately. `None` when the scheduler is ticked
    /// on its own rather than through an engine.
    pub fn registry(&mut self) -> Option<&mut EventRegistry> {
        self.registry.as_deref_mut()
    }

    /// The record that is firing
    pub fn current(&self) -> &TimerFire {
        &self.current
    }

    fn allocate(&mut self) -> ScheduleId {
        let id = ScheduleId::from_raw(*self.next_id);
        *self.next_id += 1;
        id
    }

    pub fn schedule_global<F>(&mut self, callback: F, delay_ms: u32, repeats: u32) -> ScheduleId
    where
        F: FnMut(&mut TimerContext<'_, E>, &TimerFire) -> CallbackResult<()> + Send + 'static,
    {
        let id = self.allocate();
        self.deferred.push(TimerOp::Schedule(ScheduledRecord::new(
            id,
            wrap_global(callback),
            delay_ms,
            repeats,
            None,
        )));
        id
    }

    pub fn schedule_on_entity<F>(
        &mut self,
        entity: EntityId,
        callback: F,
        delay_ms: u32,
        repeats: u32,
        kind: EntityKind,
    ) -> ScheduleId
    where
        F: FnMut(&mut TimerContext<'_, E>, &TimerFire, &E) -> CallbackResult<()> + Send + 'static,
    {
        let id = self.allocate();
        self.deferred.push(TimerOp::Schedule(ScheduledRecord::new(
            id,
            wrap_entity(callback),
            delay_ms,
            repeats,
            Some(EntityBinding { entity, kind }),
        )));
        id
    }

    pub fn remove(&mut self, id: ScheduleId) {
        self.deferred.push(TimerOp::Remove(id));
    }

    /// Stop the firing record from running again
    pub fn remove_current(&mut self) {
        let id = self.current.id;
        self.remove(id);
    }

    pub fn remove_all_for_entity(&mut self, entity: EntityId) {
        self.deferred.push(TimerOp::RemoveAllForEntity(entity));
    }

    pub fn remove_all_global(&mut self) {
        self.deferred.push(TimerOp::RemoveAllGlobal);
    }
}

/// Delayed and repeating callbacks, global or bound to an entity
///
/// `E` is the live host object handed to entity-bound callbacks.
pub struct TimedScheduler<E> {
    records: HashMap<ScheduleId, ScheduledRecord<E>>,
    global: Vec<ScheduleId>,
    by_entity: HashMap<EntityId, Vec<ScheduleId>>,
    next_id: u64,
    deferred: Vec<TimerOp<E>>,
}

impl<E: 'static> TimedScheduler<E> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            global: Vec::new(),
            by_entity: HashMap::new(),
            next_id: 1,
            deferred: Vec::new(),
        }
    }

    fn allocate(&mut self) -> ScheduleId {
        let id = ScheduleId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Schedule a callback that is not tied to any entity
    ///
    /// `repeats`: 0 fires forever, `n` fires `n` times. `delay_ms` is the
    /// interval before each firing.
    pub fn schedule_global<F>(&mut self, callback: F, delay_ms: u32, repeats: u32) -> ScheduleId
    where
        F: FnMut(&mut TimerContext<'_, E>, &TimerFire) -> CallbackResult<()> + Send + 'static,
    {
        let id = self.allocate();
        self.insert(ScheduledRecord::new(id, wrap_global(callback), delay_ms, repeats, None));
        id
    }

    /// Schedule a callback that fires against `entity` while it is alive
    pub fn schedule_on_entity<F>(
        &mut self,
        entity: EntityId,
        callback: F,
        delay_ms: u32,
        repeats: u32,
        kind: EntityKind,
    ) -> ScheduleId
    where
        F: FnMut(&mut TimerContext<'_, E>, &TimerFire, &E) -> CallbackResult<()> + Send + 'static,
    {
        let id = self.allocate();
        self.insert(ScheduledRecord::new(
            id,
            wrap_entity(callback),
            delay_ms,
            repeats,
            Some(EntityBinding { entity, kind }),
        ));
        id
    }

    fn insert(&mut self, record: ScheduledRecord<E>) {
        let id = record.id;
        match record.binding {
            Some(binding) => {
                debug!(
                    target: "timers",
                    "Scheduled timer {} on {} {} (delay={}ms, repeats={})",
                    id,
                    binding.kind,
                    binding.entity,
                    record.delay_ms,
                    record.repeats
                );
                self.by_entity.entry(binding.entity).or_default().push(id);
            }
            None => {
                debug!(
                    target: "timers",
                    "Scheduled global timer {} (delay={}ms, repeats={})",
                    id,
                    record.delay_ms,
                    record.repeats
                );
                self.global.push(id);
            }
        }
        self.records.insert(id, record);
    }

    /// Remove one record; false if the id is unknown
    pub fn remove(&mut self, id: ScheduleId) -> bool {
        let Some(record) = self.records.remove(&id) else {
            return false;
        };

        match record.binding {
            Some(binding) => {
                if let Some(ids) = self.by_entity.get_mut(&binding.entity) {
                    if let Some(pos) = ids.iter().position(|&i| i == id) {
                        ids.swap_remove(pos);
                    }
                    if ids.is_empty() {
                        self.by_entity.remove(&binding.entity);
                    }
                }
            }
            None => {
                if let Some(pos) = self.global.iter().position(|&i| i == id) {
                    self.global.swap_remove(pos);
                }
            }
        }

        debug!(target: "timers", "Removed timer {}", id);
        true
    }

    /// Drop everything bound to `entity`; call when the entity is destroyed
    pub fn remove_all_for_entity(&mut self, entity: EntityId) -> usize {
        let Some(ids) = self.by_entity.remove(&entity) else {
            return 0;
        };

        for id in &ids {
            self.records.remove(id);
        }

        debug!(target: "timers", "Removed {} timer(s) bound to {}", ids.len(), entity);
        ids.len()
    }

    pub fn remove_all_global(&mut self) -> usize {
        let ids = std::mem::take(&mut self.global);

        for id in &ids {
            self.records.remove(id);
        }

        debug!(target: "timers", "Removed {} global timer(s)", ids.len());
        ids.len()
    }

    /// Remove every record; ids keep counting up afterwards
    pub fn clear(&mut self) -> usize {
        let total = self.records.len();

        self.records.clear();
        self.global.clear();
        self.by_entity.clear();

        debug!(target: "timers", "Cleared all timers (total: {})", total);
        total
    }

    /// Advance every global record by `delta_ms`, returning how many fired
    pub fn tick(&mut self, delta_ms: u32) -> u32 {
        if self.global.is_empty() {
            return 0;
        }
        let ids = self.global.clone();
        self.scan(&ids, delta_ms, None, |_, _| None)
    }

    pub(crate) fn tick_lending(&mut self, delta_ms: u32, registry: &mut EventRegistry) -> u32 {
        if self.global.is_empty() {
            return 0;
        }
        let ids = self.global.clone();
        self.scan(&ids, delta_ms, Some(registry), |_, _| None)
    }

    /// Advance the records bound to `entity`
    ///
    /// The live object is looked up through `resolver` when a record fires. If
    /// it cannot be resolved the callback is skipped but the record still
    /// rearms and uses up a repeat.
    pub fn tick_entity<R>(&mut self, entity: EntityId, delta_ms: u32, resolver: &R) -> u32
    where
        R: EntityResolver<E> + ?Sized,
    {
        let Some(ids) = self.by_entity.get(&entity).cloned() else {
            return 0;
        };
        self.scan(&ids, delta_ms, None, |id, kind| resolver.resolve(id, kind))
    }

    pub(crate) fn tick_entity_lending<R>(
        &mut self,
        entity: EntityId,
        delta_ms: u32,
        resolver: &R,
        registry: &mut EventRegistry,
    ) -> u32
    where
        R: EntityResolver<E> + ?Sized,
    {
        let Some(ids) = self.by_entity.get(&entity).cloned() else {
            return 0;
        };
        self.scan(&ids, delta_ms, Some(registry), |id, kind| resolver.resolve(id, kind))
    }

    fn scan<F>(
        &mut self,
        ids: &[ScheduleId],
        delta_ms: u32,
        mut registry: Option<&mut EventRegistry>,
        mut resolve: F,
    ) -> u32
    where
        F: FnMut(EntityId, EntityKind) -> Option<E>,
    {
        let Self {
            records,
            next_id,
            deferred,
            ..
        } = self;

        let mut fired = 0;
        let mut exhausted = Vec::new();

        for &id in ids {
            let Some(record) = records.get_mut(&id) else {
                continue;
            };
            if deferred.iter().any(|op| op.suppresses(&*record)) {
                continue;
            }

            record.elapsed_ms = record.elapsed_ms.saturating_add(delta_ms);
            if record.elapsed_ms < record.delay_ms {
                continue;
            }

            let fire = record.fire_info();
            let target = match record.binding {
                Some(binding) => match resolve(binding.entity, binding.kind) {
                    Some(target) => Some(target),
                    None => {
                        trace!(
                            target: "timers",
                            "Timer {}: {} {} not resolvable, skipping firing",
                            id,
                            binding.kind,
                            binding.entity
                        );
                        if record.rearm() {
                            exhausted.push(id);
                        }
                        continue;
                    }
                },
                None => None,
            };

            let mut ctx = TimerContext::new(fire, next_id, deferred, registry.as_deref_mut());
            let callback = &mut record.callback;

            match invoke_guarded(|| callback(&mut ctx, &fire, target.as_ref())) {
                Ok(()) => fired += 1,
                Err(e) => error!(target: "timers", "Timer {} callback failed: {}", id, e),
            }

            if record.rearm() {
                exhausted.push(id);
            }
        }

        for id in exhausted {
            if self.remove(id) {
                trace!(target: "timers", "Timer {} used its last repeat", id);
            }
        }
        self.apply_deferred();

        fired
    }

    fn apply_deferred(&mut self) {
        if self.deferred.is_empty() {
            return;
        }

        for op in std::mem::take(&mut self.deferred) {
            match op {
                TimerOp::Schedule(record) => self.insert(record),
                TimerOp::Remove(id) => {
                    self.remove(id);
                }
                TimerOp::RemoveAllForEntity(entity) => {
                    self.remove_all_for_entity(entity);
                }
                TimerOp::RemoveAllGlobal => {
                    self.remove_all_global();
                }
            }
        }
    }

    // ===== Introspection =====

    /// Total live records, global and entity-bound
    pub fn active_count(&self) -> usize {
        self.records.len()
    }

    pub fn global_count(&self) -> usize {
        self.global.len()
    }

    pub fn entity_count(&self, entity: EntityId) -> usize {
        self.by_entity.get(&entity).map_or(0, Vec::len)
    }

    pub fn contains(&self, id: ScheduleId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn find(&self, id: ScheduleId) -> Option<&ScheduledRecord<E>> {
        self.records.get(&id)
    }

    /// Snapshot of the entities that currently have records
    pub fn bound_entities(&self) -> Vec<EntityId> {
        self.by_entity.keys().copied().collect()
    }
}

impl<E: 'static> Default for TimedScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    type Scheduler = TimedScheduler<String>;

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    fn resolve_named(id: EntityId, _kind: EntityKind) -> Option<String> {
        Some(format!("npc-{}", id.as_u64()))
    }

    fn resolve_nothing(_id: EntityId, _kind: EntityKind) -> Option<String> {
        None
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule_global(|_, _| Ok(()), 100, 1);
        let b = scheduler.schedule_on_entity(EntityId::new(1), |_, _, _| Ok(()), 100, 1, EntityKind::Creature);
        assert_eq!(a.as_u64(), 1);
        assert_eq!(b.as_u64(), 2);
    }

    #[test]
    fn test_single_shot_fires_after_delay() {
        let mut scheduler = Scheduler::new();
        let count = counter();
        let c = Arc::clone(&count);
        let id = scheduler.schedule_global(
            move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            5000,
            1,
        );

        assert_eq!(scheduler.tick(3000), 0);
        assert_eq!(scheduler.find(id).map(ScheduledRecord::elapsed_ms), Some(3000));

        assert_eq!(scheduler.tick(3000), 1);
        assert!(!scheduler.contains(id));

        assert_eq!(scheduler.tick(10_000), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_elapsed_resets_without_carry() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_global(|_, _| Ok(()), 100, 0);

        assert_eq!(scheduler.tick(250), 1);
        assert_eq!(scheduler.find(id).map(ScheduledRecord::elapsed_ms), Some(0));
        assert_eq!(scheduler.tick(50), 0);
        assert_eq!(scheduler.tick(50), 1);
    }

    #[test]
    fn test_repeat_count_is_honoured() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_global(|_, _| Ok(()), 10, 3);

        let fired: u32 = (0..5).map(|_| scheduler.tick(10)).sum();
        assert_eq!(fired, 3);
        assert!(!scheduler.contains(id));
    }

    #[test]
    fn test_infinite_repeats_never_expire() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_global(|_, _| Ok(()), 1, 0);
        for _ in 0..1000 {
            scheduler.tick(1);
        }
        assert!(scheduler.contains(id));
    }

    #[test]
    fn test_zero_delay_fires_every_tick() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_global(|_, _| Ok(()), 0, 0);
        assert_eq!(scheduler.tick(0), 1);
        assert_eq!(scheduler.tick(0), 1);
    }

    #[test]
    fn test_fire_info_is_passed() {
        let mut scheduler = Scheduler::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let id = scheduler.schedule_global(
            move |ctx, fire| {
                assert_eq!(ctx.current(), fire);
                *sink.lock().unwrap() = Some(*fire);
                Ok(())
            },
            20,
            4,
        );

        scheduler.tick(20);
        assert_eq!(
            *seen.lock().unwrap(),
            Some(TimerFire {
                id,
                delay_ms: 20,
                repeats: 4
            })
        );
        assert_eq!(scheduler.find(id).map(ScheduledRecord::remaining_repeats), Some(3));
    }

    #[test]
    fn test_failing_callback_does_not_stop_scan() {
        let mut scheduler = Scheduler::new();
        let count = counter();
        let c = Arc::clone(&count);

        let failing = scheduler.schedule_global(|_, _| panic!("timer script exploded"), 10, 2);
        scheduler.schedule_global(
            move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            10,
            0,
        );

        assert_eq!(scheduler.tick(10), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        // The failed record still rearmed and used a repeat
        assert_eq!(scheduler.find(failing).map(ScheduledRecord::remaining_repeats), Some(1));
    }

    #[test]
    fn test_tick_entity_resolves_at_fire_time() {
        let mut scheduler = Scheduler::new();
        let npc = EntityId::new(42);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        scheduler.schedule_on_entity(
            npc,
            move |_, _, name: &String| {
                sink.lock().unwrap().push(name.clone());
                Ok(())
            },
            100,
            0,
            EntityKind::Creature,
        );

        // Global ticks never touch entity-bound records
        assert_eq!(scheduler.tick(1000), 0);

        assert_eq!(scheduler.tick_entity(npc, 100, &resolve_named), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["npc-42".to_string()]);
    }

    #[test]
    fn test_unresolved_entity_skips_but_advances() {
        let mut scheduler = Scheduler::new();
        let count = counter();
        let c = Arc::clone(&count);
        let npc = EntityId::new(9);

        let id = scheduler.schedule_on_entity(
            npc,
            move |_, _, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            50,
            2,
            EntityKind::Player,
        );

        assert_eq!(scheduler.tick_entity(npc, 50, &resolve_nothing), 0);
        assert_eq!(scheduler.find(id).map(ScheduledRecord::remaining_repeats), Some(1));
        assert_eq!(scheduler.find(id).map(ScheduledRecord::elapsed_ms), Some(0));

        assert_eq!(scheduler.tick_entity(npc, 50, &resolve_nothing), 0);
        assert!(!scheduler.contains(id));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_all_for_entity() {
        let mut scheduler = Scheduler::new();
        let npc = EntityId::new(3);
        let other = EntityId::new(4);
        let count = counter();

        for target in [npc, npc, other] {
            let c = Arc::clone(&count);
            scheduler.schedule_on_entity(
                target,
                move |_, _, _| {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                10,
                0,
                EntityKind::Creature,
            );
        }

        assert_eq!(scheduler.remove_all_for_entity(npc), 2);
        assert_eq!(scheduler.tick_entity(npc, 10_000, &resolve_named), 0);
        assert_eq!(scheduler.entity_count(npc), 0);
        assert_eq!(scheduler.entity_count(other), 1);
        assert_eq!(scheduler.bound_entities(), vec![other]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule_global(|_, _| Ok(()), 10, 1);
        let b = scheduler.schedule_global(|_, _| Ok(()), 10, 1);

        assert!(scheduler.remove(a));
        assert!(!scheduler.remove(a));
        assert_eq!(scheduler.global_count(), 1);
        assert!(scheduler.contains(b));
    }

    #[test]
    fn test_remove_all_global_keeps_entity_records() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_global(|_, _| Ok(()), 10, 1);
        scheduler.schedule_global(|_, _| Ok(()), 10, 1);
        scheduler.schedule_on_entity(EntityId::new(1), |_, _, _| Ok(()), 10, 1, EntityKind::GameObject);

        assert_eq!(scheduler.remove_all_global(), 2);
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_clear_does_not_reuse_ids() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule_global(|_, _| Ok(()), 10, 1);
        assert_eq!(scheduler.clear(), 1);
        let second = scheduler.schedule_global(|_, _| Ok(()), 10, 1);
        assert!(second > first);
    }

    #[test]
    fn test_callback_can_remove_itself() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_global(
            |ctx, _| {
                ctx.remove_current();
                Ok(())
            },
            10,
            0,
        );

        assert_eq!(scheduler.tick(10), 1);
        assert!(!scheduler.contains(id));
    }

    #[test]
    fn test_removed_mid_scan_does_not_fire() {
        let mut scheduler = Scheduler::new();
        let count = counter();
        let c = Arc::clone(&count);

        // Ids are allocated in order, so the first record knows the second's id
        let victim = ScheduleId::from_raw(2);
        scheduler.schedule_global(
            move |ctx, _| {
                ctx.remove(victim);
                Ok(())
            },
            10,
            1,
        );
        let second = scheduler.schedule_global(
            move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            10,
            1,
        );
        assert_eq!(second, victim);

        // Snapshot order is insertion order until a swap-remove reorders it
        assert_eq!(scheduler.tick(10), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_schedule_from_callback_runs_next_tick() {
        let mut scheduler = Scheduler::new();
        let count = counter();
        let c = Arc::clone(&count);

        scheduler.schedule_global(
            move |ctx, _| {
                let c = Arc::clone(&c);
                ctx.schedule_global(
                    move |_, _| {
                        c.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                    0,
                    1,
                );
                Ok(())
            },
            10,
            1,
        );

        assert_eq!(scheduler.tick(10), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.global_count(), 1);

        assert_eq!(scheduler.tick(0), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_registry_is_reachable_only_when_lent() {
        use ember_events::{PlayerEvent, ScopeId};

        let mut scheduler = Scheduler::new();
        let mut registry = EventRegistry::new();
        let reached = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reached);

        scheduler.schedule_global(
            move |ctx, _| {
                let lent = ctx.registry().map(|registry| {
                    registry.register_global(PlayerEvent::Login, |_, _| Ok(None), 1, ScopeId::MASTER)
                });
                sink.lock().unwrap().push(lent.is_some());
                Ok(())
            },
            10,
            2,
        );

        assert_eq!(scheduler.tick(10), 1);
        assert!(registry.is_empty());

        assert_eq!(scheduler.tick_lending(10, &mut registry), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(*reached.lock().unwrap(), vec![false, true]);
    }
}
