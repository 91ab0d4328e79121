use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ember_runner::{init_logging, ConfigLoadError, EmberConfig, TickDriver};
use tokio::sync::watch;
use tracing::{info, warn};

mod simulate;
mod world;

use simulate::Simulation;

#[derive(Parser)]
#[command(version = env!("VERSION_STRING"), about, long_about = None)]
pub struct Cli {
    /// Enables debug mode (-d for debug, -dd for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write an example config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Run the demo scripts against a small in-memory world
    Simulate {
        /// Number of host steps to run
        #[arg(long, default_value_t = 100)]
        steps: u32,

        /// Milliseconds of game time per step
        #[arg(long, default_value_t = 50)]
        step_ms: u32,

        /// Drive timers from the wall clock instead of fixed steps
        #[arg(long)]
        realtime: bool,
    },
}

const EXAMPLE_CONFIG: &str = r#"# Ember Configuration

[engine]
enabled = true
# Handler shot limit when a script omits it (0 = unlimited)
default_shots = 0
# Timer repeat count when a script omits it (0 = forever)
default_repeats = 1

[runner]
tick_interval_ms = 50
max_delta_ms = 1000

[logging]
file = false
filter = "info"
"#;

fn config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(EmberConfig::config_path()?),
    }
}

fn create_example_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    fs::write(path, EXAMPLE_CONFIG).with_context(|| format!("writing {}", path.display()))?;
    eprintln!("Config file created at: {}", path.display());
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<(EmberConfig, bool)> {
    match EmberConfig::load_from(path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigLoadError::NotFound(_)) => Ok((EmberConfig::default(), false)),
        Err(e) => Err(e.into()),
    }
}

async fn run_realtime(mut sim: Simulation, config: &EmberConfig, duration: Duration) -> Simulation {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping early");
            }
        }
        let _ = shutdown_tx.send(true);
    });

    let mut driver = TickDriver::new(&config.runner);
    let (engine, world) = sim.parts();
    let steps = driver.run(engine, world, shutdown_rx).await;
    info!("Realtime run took {} step(s)", steps);
    sim
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = config_path(&cli)?;

    if let Some(Command::Init { force }) = &cli.command {
        return create_example_config(&path, *force);
    }

    let (mut config, found) = load_config(&path)?;
    match cli.debug {
        0 => {}
        1 => config.logging.filter = "debug".to_string(),
        _ => config.logging.filter = "trace".to_string(),
    }

    let _guard = init_logging("cli", &config.logging)?;
    if found {
        info!("Using config {}", path.display());
    } else {
        warn!(
            "No config at {}, using defaults (run `ember init` to create one)",
            path.display()
        );
    }

    let (steps, step_ms, realtime) = match &cli.command {
        Some(Command::Simulate {
            steps,
            step_ms,
            realtime,
        }) => (*steps, *step_ms, *realtime),
        _ => (100, 50, false),
    };

    let mut sim = Simulation::new(config.engine.options());
    if realtime {
        let duration = Duration::from_millis(u64::from(steps) * u64::from(step_ms));
        info!("Driving timers on the wall clock for {:?}", duration);
        sim = run_realtime(sim, &config, duration).await;
    } else {
        info!("Simulating {} step(s) of {}ms", steps, step_ms);
        for _ in 0..steps {
            sim.step(step_ms);
        }
    }

    let active_timers = sim.engine_mut().scheduler().active_count();
    let report = sim.finish();
    info!(
        "Done: {} step(s), {} timer firing(s) ({} pulse(s), {} creature check(s)), {} handler run(s), {} login(s), {} death(s), {} xp awarded, {} timer(s) still armed, {} creature(s) left",
        report.steps,
        report.timers_fired,
        report.pulses,
        report.creature_checks,
        report.handlers_run,
        report.logins,
        report.deaths,
        report.xp_awarded,
        active_timers,
        report.creatures_left
    );

    Ok(())
}
