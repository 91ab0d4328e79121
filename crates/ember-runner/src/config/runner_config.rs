use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// How often the driver steps the engine (default: 50ms)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Largest delta handed to the engine in one step, e.g. after a stall
    #[serde(default = "default_max_delta")]
    pub max_delta_ms: u32,
}

fn default_tick_interval() -> u64 {
    50
}

fn default_max_delta() -> u32 {
    1000
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            max_delta_ms: default_max_delta(),
        }
    }
}

impl RunnerConfig {
    pub fn tick_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
