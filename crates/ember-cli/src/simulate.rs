use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ember_events::{CreatureEvent, PlayerEvent};
use ember_scripting_host::{
    EngineContext, EngineOptions, EntityId, EntityKind, EventKey, ScopeId, Value,
};
use tracing::{debug, info};

use crate::world::{Creature, World};

pub const WOLF_ENTRY: u32 = 299;
pub const BOSS_ENTRY: u32 = 448;

/// Scope owning everything the demo script registers
const DEMO_SCOPE: ScopeId = ScopeId::new(1);

/// Counters shared with the demo callbacks
#[derive(Debug, Clone, Default)]
struct Tally {
    logins: Arc<AtomicU32>,
    deaths: Arc<AtomicU32>,
    pulses: Arc<AtomicU32>,
    creature_checks: Arc<AtomicU32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub steps: u32,
    pub timers_fired: u32,
    pub handlers_run: u32,
    pub logins: u32,
    pub deaths: u32,
    pub pulses: u32,
    pub creature_checks: u32,
    pub xp_awarded: u64,
    pub creatures_left: usize,
}

/// A scripted skirmish: a player logging in now and then, a pack of wolves
/// and a boss taking damage every step until they die
pub struct Simulation {
    engine: EngineContext<Creature>,
    world: World,
    player: EntityId,
    tally: Tally,
    report: SimulationReport,
}

impl Simulation {
    pub fn new(options: EngineOptions) -> Self {
        let mut world = World::new();
        for _ in 0..3 {
            world.spawn(WOLF_ENTRY, "Young Wolf", 20);
        }
        let boss = world.spawn(BOSS_ENTRY, "Hogger", 70);

        let mut sim = Self {
            engine: EngineContext::new(options),
            world,
            player: EntityId::new(0x1),
            tally: Tally::default(),
            report: SimulationReport::default(),
        };
        sim.load_scripts(boss);
        sim
    }

    fn load_scripts(&mut self, boss: EntityId) {
        let options = *self.engine.options();
        let shots = options.shots_or_default(None);
        let registry = self.engine.registry_mut();

        let logins = Arc::clone(&self.tally.logins);
        registry.register_global(
            PlayerEvent::Login,
            move |ctx, args| {
                let player = args.first().and_then(|v| v.decode::<EntityId>());
                logins.fetch_add(1, Ordering::SeqCst);
                info!(target: "simulate", "[{}] player {:?} logged in", ctx.key(), player);
                Ok(None)
            },
            shots,
            DEMO_SCOPE,
        );

        // Rested bonus: double whatever the host offers
        registry.register_global(
            PlayerEvent::GiveXp,
            |_, args| {
                let xp = args.get(1).and_then(|v| v.decode::<u32>()).unwrap_or(0);
                Ok(Some(Value::from(xp.saturating_mul(2))))
            },
            shots,
            DEMO_SCOPE,
        );

        let deaths = Arc::clone(&self.tally.deaths);
        registry.register_entry(
            CreatureEvent::Death,
            WOLF_ENTRY,
            move |_, args| {
                deaths.fetch_add(1, Ordering::SeqCst);
                debug!(target: "simulate", "A wolf died: {:?}", args.first());
                Ok(None)
            },
            shots,
            DEMO_SCOPE,
        );

        // The boss only announces itself once, then arms its own death handler
        let deaths = Arc::clone(&self.tally.deaths);
        registry.register_unique(
            CreatureEvent::EnterCombat,
            boss,
            move |ctx, _| {
                info!(target: "simulate", "Hogger yells: More bones to gnaw on!");
                let deaths = Arc::clone(&deaths);
                ctx.register(
                    EventKey::unique(CreatureEvent::Death, boss),
                    move |_, _| {
                        deaths.fetch_add(1, Ordering::SeqCst);
                        info!(target: "simulate", "Hogger has been defeated");
                        Ok(None)
                    },
                    1,
                    DEMO_SCOPE,
                );
                Ok(None)
            },
            1,
            DEMO_SCOPE,
        );

        let scheduler = self.engine.scheduler_mut();

        let pulses = Arc::clone(&self.tally.pulses);
        scheduler.schedule_global(
            move |_, fire| {
                let n = pulses.fetch_add(1, Ordering::SeqCst) + 1;
                info!(target: "simulate", "World pulse #{} (timer {})", n, fire.id);
                Ok(())
            },
            1000,
            0,
        );

        let repeats = options.repeats_or_default(Some(8));
        for id in self.world.creature_ids() {
            let checks = Arc::clone(&self.tally.creature_checks);
            scheduler.schedule_on_entity(
                id,
                move |ctx, _, creature: &Creature| {
                    checks.fetch_add(1, Ordering::SeqCst);
                    debug!(
                        target: "simulate",
                        "{} ({}) has {} health",
                        creature.name,
                        creature.id,
                        creature.health
                    );
                    if creature.health == 0 {
                        ctx.remove_current();
                    }
                    Ok(())
                },
                250,
                repeats,
                EntityKind::Creature,
            );
        }
    }

    /// One host step: advance timers, then play out the step's events
    pub fn step(&mut self, delta_ms: u32) {
        self.report.steps += 1;
        let step = self.report.steps;

        let stats = self.engine.update(delta_ms, &self.world);
        self.report.timers_fired += stats.total_fired();

        if step % 10 == 1 {
            let player = Value::from(self.player);
            self.report.handlers_run += self.engine.trigger_global(PlayerEvent::Login, &[player.clone()]);
            let xp: u32 = self.engine.trigger_global_with_return(
                PlayerEvent::GiveXp,
                10,
                &[player, Value::from(10u32)],
            );
            self.report.xp_awarded += u64::from(xp);
        }

        for id in self.world.creature_ids() {
            if step == 1 {
                self.report.handlers_run +=
                    self.engine
                        .trigger_unique(CreatureEvent::EnterCombat, id, &[Value::from(id)]);
            }

            let Some(health) = self.world.damage(id, 7) else {
                continue;
            };
            if health > 0 {
                continue;
            }

            if let Some(creature) = self.world.despawn(id) {
                self.report.handlers_run +=
                    self.engine
                        .trigger_entry(CreatureEvent::Death, creature.entry, &[Value::from(id)]);
                self.report.handlers_run +=
                    self.engine
                        .trigger_unique(CreatureEvent::Death, id, &[Value::from(id)]);
                self.engine.on_entity_destroyed(id);
            }
        }
    }

    pub fn engine_mut(&mut self) -> &mut EngineContext<Creature> {
        &mut self.engine
    }

    /// Engine and world together, for driving timers off the wall clock
    pub fn parts(&mut self) -> (&mut EngineContext<Creature>, &World) {
        (&mut self.engine, &self.world)
    }

    /// Tear the demo script down and collect the counters
    pub fn finish(mut self) -> SimulationReport {
        let released = self.engine.teardown_scope(DEMO_SCOPE);
        debug!(target: "simulate", "Released {} demo handler(s)", released);
        self.engine.shutdown();
        if !self.world.is_empty() {
            info!(target: "simulate", "{} creature(s) survived the skirmish", self.world.len());
        }

        let mut report = self.report;
        report.logins = self.tally.logins.load(Ordering::SeqCst);
        report.deaths = self.tally.deaths.load(Ordering::SeqCst);
        report.pulses = self.tally.pulses.load(Ordering::SeqCst);
        report.creature_checks = self.tally.creature_checks.load(Ordering::SeqCst);
        report.creatures_left = self.world.len();
        report
    }
}
