use ember_events::{EntityId, EventKey, FromValue, Hook, ScopeId, Value};
use tracing::{debug, info, trace};

use crate::entity::EntityResolver;
use crate::registry::EventRegistry;
use crate::timer::TimedScheduler;

/// Engine-wide defaults applied when a script leaves a value out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// When false, `update` does not advance any timers
    pub enabled: bool,
    /// Handler shot limit used when none is given (0 = unlimited)
    pub default_shots: u32,
    /// Timer repeat count used when none is given (0 = forever)
    pub default_repeats: u32,
}

impl EngineOptions {
    pub fn shots_or_default(&self, shots: Option<u32>) -> u32 {
        shots.unwrap_or(self.default_shots)
    }

    pub fn repeats_or_default(&self, repeats: Option<u32>) -> u32 {
        repeats.unwrap_or(self.default_repeats)
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            default_shots: 0,
            default_repeats: 1,
        }
    }
}

/// What a single [`EngineContext::update`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub global_fired: u32,
    pub entity_fired: u32,
    pub entities_ticked: usize,
}

impl UpdateStats {
    pub fn total_fired(&self) -> u32 {
        self.global_fired + self.entity_fired
    }
}

/// Owns one event registry and one scheduler for a script host
///
/// Passed explicitly to whatever raises events or drives time, so several
/// independent engines can live in one process.
///
/// Events raised through the engine's `trigger*` methods can reach the
/// scheduler from their handlers ([`HookContext::scheduler`]), and timers fired
/// by [`update`](Self::update) can reach the registry
/// ([`TimerContext::registry`]). Raising events straight on
/// [`registry_mut`](Self::registry_mut) gives handlers no scheduler.
///
/// [`HookContext::scheduler`]: crate::HookContext::scheduler
/// [`TimerContext::registry`]: crate::TimerContext::registry
pub struct EngineContext<E> {
    options: EngineOptions,
    registry: EventRegistry,
    scheduler: TimedScheduler<E>,
}

impl<E: 'static> EngineContext<E> {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            registry: EventRegistry::new(),
            scheduler: TimedScheduler::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EventRegistry {
        &mut self.registry
    }

    pub fn scheduler(&self) -> &TimedScheduler<E> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TimedScheduler<E> {
        &mut self.scheduler
    }

    /// One simulation step: global timers, then every entity with timers
    pub fn update<R>(&mut self, delta_ms: u32, resolver: &R) -> UpdateStats
    where
        R: EntityResolver<E> + ?Sized,
    {
        let mut stats = UpdateStats::default();
        if !self.options.enabled {
            trace!(target: "timers", "Engine disabled, skipping update");
            return stats;
        }

        let Self {
            registry,
            scheduler,
            ..
        } = self;

        stats.global_fired = scheduler.tick_lending(delta_ms, registry);

        for entity in scheduler.bound_entities() {
            stats.entity_fired += scheduler.tick_entity_lending(entity, delta_ms, resolver, registry);
            stats.entities_ticked += 1;
        }

        stats
    }

    // ===== Events =====

    /// Raise the event under `key` with the scheduler lent to its handlers
    pub fn trigger(&mut self, key: EventKey, args: &[Value]) -> u32 {
        let Self {
            registry,
            scheduler,
            ..
        } = self;
        registry.trigger_lending(key, args, scheduler)
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

    /// See [`EventRegistry::trigger_with_return`]
    pub fn trigger_with_return<T: FromValue>(&mut self, key: EventKey, default: T, args: &[Value]) -> T {
        let Self {
            registry,
            scheduler,
            ..
        } = self;
        registry.trigger_with_return_lending(key, default, args, scheduler)
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

    // ===== Lifecycle =====

    /// Host hook for entity destruction
    pub fn on_entity_destroyed(&mut self, entity: EntityId) -> usize {
        self.scheduler.remove_all_for_entity(entity)
    }

    /// Host hook for a script context being torn down
    pub fn teardown_scope(&mut self, scope: ScopeId) -> usize {
        let cancelled = self.registry.cancel_scope(scope);
        debug!(target: "events", "Scope {} torn down", scope);
        cancelled
    }

    /// Drop every handler and timer ahead of loading scripts again
    pub fn reload(&mut self) -> (usize, usize) {
        let (handlers, timers) = self.release_all();
        info!(
            target: "engine",
            "Reloading scripts: dropped {} handler(s) and {} timer(s)",
            handlers,
            timers
        );
        (handlers, timers)
    }

    pub fn shutdown(&mut self) -> (usize, usize) {
        let (handlers, timers) = self.release_all();
        info!(
            target: "engine",
            "Script engine shut down ({} handler(s), {} timer(s) released)",
            handlers,
            timers
        );
        (handlers, timers)
    }

    fn release_all(&mut self) -> (usize, usize) {
        (self.registry.cancel_all(), self.scheduler.clear())
    }
}

impl<E: 'static> Default for EngineContext<E> {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_events::{EntityKind, PlayerEvent};

    fn resolve_any(id: EntityId, _kind: EntityKind) -> Option<u64> {
        Some(id.as_u64())
    }

    #[test]
    fn test_option_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.shots_or_default(None), 0);
        assert_eq!(options.shots_or_default(Some(3)), 3);
        assert_eq!(options.repeats_or_default(None), 1);
    }

    #[test]
    fn test_update_ticks_global_and_entities() {
        let mut engine: EngineContext<u64> = EngineContext::default();
        engine.scheduler_mut().schedule_global(|_, _| Ok(()), 10, 0);
        engine.scheduler_mut().schedule_on_entity(EntityId::new(1), |_, _, _| Ok(()), 10, 0, EntityKind::Creature);
        engine.scheduler_mut().schedule_on_entity(EntityId::new(2), |_, _, _| Ok(()), 20, 0, EntityKind::Creature);

        let stats = engine.update(10, &resolve_any);
        assert_eq!(stats.global_fired, 1);
        assert_eq!(stats.entity_fired, 1);
        assert_eq!(stats.entities_ticked, 2);
        assert_eq!(stats.total_fired(), 2);
    }

    #[test]
    fn test_disabled_engine_does_not_tick() {
        let mut engine: EngineContext<u64> = EngineContext::new(EngineOptions {
            enabled: false,
            ..EngineOptions::default()
        });
        engine.scheduler_mut().schedule_global(|_, _| Ok(()), 0, 0);
        assert_eq!(engine.update(100, &resolve_any), UpdateStats::default());
    }

    #[test]
    fn test_reload_clears_everything() {
        let mut engine: EngineContext<u64> = EngineContext::default();
        engine
            .registry_mut()
            .register_global(PlayerEvent::Login, |_, _| Ok(None), 0, ScopeId::MASTER);
        engine.scheduler_mut().schedule_global(|_, _| Ok(()), 10, 0);

        assert_eq!(engine.reload(), (1, 1));
        assert!(engine.registry().is_empty());
        assert_eq!(engine.scheduler().active_count(), 0);
    }

    #[test]
    fn test_shutdown_reports_released_counts() {
        let mut engine: EngineContext<u64> = EngineContext::default();
        engine
            .registry_mut()
            .register_global(PlayerEvent::Login, |_, _| Ok(None), 0, ScopeId::MASTER);
        engine
            .registry_mut()
            .register_global(PlayerEvent::Logout, |_, _| Ok(None), 0, ScopeId::MASTER);
        engine.scheduler_mut().schedule_global(|_, _| Ok(()), 10, 0);

        assert_eq!(engine.shutdown(), (2, 1));
        // Nothing left for a second pass
        assert_eq!(engine.shutdown(), (0, 0));
    }

    #[test]
    fn test_handler_schedules_through_engine_trigger() {
        let mut engine: EngineContext<u64> = EngineContext::default();
        engine.registry_mut().register_global(
            PlayerEvent::Login,
            |ctx, _| {
                let scheduler = ctx.scheduler::<u64>().ok_or_else(|| anyhow::anyhow!("no scheduler"))?;
                scheduler.schedule_global(|_, _| Ok(()), 10, 1);
                Ok(None)
            },
            0,
            ScopeId::MASTER,
        );

        // Raised on the bare registry the handler fails and schedules nothing
        assert_eq!(engine.registry_mut().trigger_global(PlayerEvent::Login, &[]), 0);
        assert_eq!(engine.scheduler().active_count(), 0);

        assert_eq!(engine.trigger_global(PlayerEvent::Login, &[]), 1);
        assert_eq!(engine.scheduler().global_count(), 1);
        assert_eq!(engine.update(10, &resolve_any).global_fired, 1);
    }

    #[test]
    fn test_timer_registers_handler_through_update() {
        let mut engine: EngineContext<u64> = EngineContext::default();
        engine.scheduler_mut().schedule_global(
            |ctx, _| {
                if let Some(registry) = ctx.registry() {
                    registry.register_global(PlayerEvent::Logout, |_, _| Ok(None), 1, ScopeId::MASTER);
                }
                Ok(())
            },
            10,
            1,
        );

        assert_eq!(engine.update(10, &resolve_any).global_fired, 1);
        assert_eq!(engine.trigger_global(PlayerEvent::Logout, &[]), 1);
        assert!(engine.registry().is_empty());
    }
}
