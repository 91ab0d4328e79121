//! Glue for running an ember engine inside a host process: TOML
//! configuration, logging setup, and the tick driver that feeds elapsed time
//! into the scheduler.

pub mod config;
pub mod driver;
pub mod logging;

pub use config::{ConfigLoadError, EmberConfig, EngineConfig, LoggingConfig, RunnerConfig};
pub use driver::TickDriver;
pub use logging::{init_logging, LoggingError};
