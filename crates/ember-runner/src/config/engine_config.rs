use ember_scripting_host::EngineOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether scripted timers run at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Handler shot limit when a script omits it (0 = unlimited)
    #[serde(default)]
    pub default_shots: u32,

    /// Timer repeat count when a script omits it (0 = forever)
    #[serde(default = "default_repeats")]
    pub default_repeats: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_repeats() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_shots: 0,
            default_repeats: 1,
        }
    }
}

impl EngineConfig {
    pub fn options(&self) -> EngineOptions {
        EngineOptions {
            enabled: self.enabled,
            default_shots: self.default_shots,
            default_repeats: self.default_repeats,
        }
    }
}
