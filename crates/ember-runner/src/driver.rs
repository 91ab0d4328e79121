use std::time::Duration;

use ember_scripting_host::{EngineContext, EntityResolver, UpdateStats};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::RunnerConfig;

/// Turns wall-clock time into the millisecond deltas the engine is driven by
///
/// Deltas are measured between steps rather than assumed from the interval,
/// and anything below a millisecond is carried into the next step.
#[derive(Debug)]
pub struct TickDriver {
    interval: Duration,
    max_delta_ms: u32,
    last_step: Option<Instant>,
    carry: Duration,
    steps: u64,
}

impl TickDriver {
    pub fn new(config: &RunnerConfig) -> Self {
        Self::with_interval(config.tick_interval(), config.max_delta_ms)
    }

    pub fn with_interval(interval: Duration, max_delta_ms: u32) -> Self {
        Self {
            interval,
            max_delta_ms,
            last_step: None,
            carry: Duration::ZERO,
            steps: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Steps taken so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Milliseconds to hand the engine for a step at `now`
    ///
    /// The first call only establishes the baseline and yields 0.
    pub fn delta_ms(&mut self, now: Instant) -> u32 {
        let Some(last) = self.last_step.replace(now) else {
            return 0;
        };

        let elapsed = now.saturating_duration_since(last) + self.carry;
        let whole_ms = elapsed.as_millis();

        if whole_ms > u128::from(self.max_delta_ms) {
            warn!(
                target: "runner",
                "Step delta of {}ms exceeds the {}ms cap, clamping",
                whole_ms,
                self.max_delta_ms
            );
            self.carry = Duration::ZERO;
            return self.max_delta_ms;
        }

        // whole_ms <= max_delta_ms here, so it fits in u32
        let delta = whole_ms as u32;
        self.carry = elapsed - Duration::from_millis(u64::from(delta));
        delta
    }

    /// Advance the engine by the time elapsed since the previous step
    pub fn step<E, R>(&mut self, ctx: &mut EngineContext<E>, resolver: &R, now: Instant) -> UpdateStats
    where
        E: 'static,
        R: EntityResolver<E> + ?Sized,
    {
        let delta = self.delta_ms(now);
        self.steps += 1;

        let stats = ctx.update(delta, resolver);
        if stats.total_fired() > 0 {
            trace!(
                target: "runner",
                "Step {} ({}ms): {} global, {} entity timer(s) fired",
                self.steps,
                delta,
                stats.global_fired,
                stats.entity_fired
            );
        }
        stats
    }

    /// Step the engine on a fixed interval until `shutdown` turns true
    ///
    /// Returns the number of steps taken by this call.
    pub async fn run<E, R>(
        &mut self,
        ctx: &mut EngineContext<E>,
        resolver: &R,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64
    where
        E: 'static,
        R: EntityResolver<E> + ?Sized,
    {
        let started_at = self.steps;
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(target: "runner", "Tick driver started ({:?} interval)", self.interval);

        if *shutdown.borrow() {
            debug!(target: "runner", "Shutdown requested before the first step");
            return 0;
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.step(ctx, resolver, Instant::now());
                }
                changed = shutdown.changed() => {
                    // A dropped sender also means shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let taken = self.steps - started_at;
        info!(target: "runner", "Tick driver stopped after {} step(s)", taken);
        taken
    }
}
