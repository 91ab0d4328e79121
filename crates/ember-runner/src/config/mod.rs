pub mod ember_config;
pub mod engine_config;
pub mod logging_config;
pub mod runner_config;

pub use ember_config::{ConfigLoadError, EmberConfig};
pub use engine_config::EngineConfig;
pub use logging_config::LoggingConfig;
pub use runner_config::RunnerConfig;
