mod config;
mod controller;
mod message;
mod replay;
mod track;
mod transport;

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::config::{ConfigError, ControllerSettings, HarnessConfig};
use crate::controller::{shared, SimulatedController};
use crate::message::{MessageFactory, OrientationPayload};
use crate::replay::{expected_ticks, ReplayLoop, ReplayOutcome, RunArtifacts};
use crate::track::TrackSource;
use crate::transport::{BusTransport, DirectTransport, TransportMode};

#[derive(Parser)]
#[command(name = "ptz-replay")]
#[command(about = "Replay recorded tracks against the PTZ pointing controller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a track file and report what a replay would do
    Validate {
        /// The track identifier to process
        #[arg(short, long, default_value = "A1E946")]
        track_id: String,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Tick interval in seconds (defaults to the controller update interval)
        #[arg(long)]
        tick: Option<f64>,
        /// YAML configuration file supplying the controller update interval
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Replay a track and write the history table
    Run {
        /// The track identifier to process
        #[arg(short, long, default_value = "A1E946")]
        track_id: String,
        /// Deliver messages through the broker instead of calling the controller directly
        #[arg(short = 'm', long)]
        use_bus: bool,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// YAML configuration file; the environment is used when absent
        #[arg(short, long)]
        config: Option<String>,
        /// Orientation reference JSON; zero orientation when absent
        #[arg(long)]
        orientation: Option<PathBuf>,
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
        /// Wait after each bus publish, e.g. "10ms"
        #[arg(long, value_parser = humantime::parse_duration)]
        settle: Option<Duration>,
        /// History columns to summarize after the run, e.g. "rho_c,tau_c"
        #[arg(long, value_delimiter = ',')]
        series: Vec<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            track_id,
            data_dir,
            tick,
            config,
        } => validate(&data_dir, &track_id, tick, config.as_deref()),
        Commands::Run {
            track_id,
            use_bus,
            data_dir,
            config,
            orientation,
            output,
            settle,
            series,
        } => {
            let args = RunArgs {
                track_id,
                mode: TransportMode::from_flag(use_bus),
                data_dir,
                config,
                orientation,
                output,
                settle,
            };
            match run(&args) {
                Ok(outcome) => {
                    println!(
                        "Replayed {} ticks ({} deliveries) over {} transport",
                        outcome.history.len(),
                        outcome.deliveries,
                        outcome.mode
                    );
                    let last = outcome.history.last();
                    println!(
                        "  final pointing: pan {:.3} deg, tilt {:.3} deg",
                        last.rho_c, last.tau_c
                    );
                    print_series(&outcome, &series);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Replay failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn validate(
    data_dir: &Path,
    track_id: &str,
    tick: Option<f64>,
    config: Option<&str>,
) -> ExitCode {
    let tick = match replay_tick(tick, config) {
        Ok(tick) => tick,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let track = match TrackSource::load(data_dir, track_id) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error loading track: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match expected_ticks(&track, tick) {
        Ok(ticks) => {
            println!(
                "Track {} is valid ({} samples, {:.2} s)",
                track.id(),
                track.len(),
                track.span()
            );
            println!("  replay at {} s per tick: {} ticks", tick, ticks);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Invalid tick: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// An explicit tick wins, then the configured update interval, then the default.
fn replay_tick(tick: Option<f64>, config: Option<&str>) -> Result<f64, ConfigError> {
    if let Some(tick) = tick {
        return Ok(tick);
    }
    let settings = match config {
        Some(path) => HarnessConfig::from_file(path)?.controller,
        None => ControllerSettings::default(),
    };
    Ok(settings.update_interval)
}

fn print_series(outcome: &ReplayOutcome, names: &[String]) {
    for name in names {
        let Some(values) = outcome.history.series_by_name(name) else {
            log::warn!("Unknown history series '{}'", name);
            continue;
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!(
            "  {}: first {:.3}, last {:.3}, min {:.3}, max {:.3}",
            name,
            values[0],
            values[values.len() - 1],
            min,
            max
        );
    }
}

struct RunArgs {
    track_id: String,
    mode: TransportMode,
    data_dir: PathBuf,
    config: Option<String>,
    orientation: Option<PathBuf>,
    output: PathBuf,
    settle: Option<Duration>,
}

fn run(args: &RunArgs) -> Result<ReplayOutcome, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::from_env()?,
    };
    if args.settle.is_some() {
        config.broker.settle = args.settle;
    }
    config.validate(args.mode)?;
    if config.camera.is_configured() {
        log::info!("Camera credentials present; pointing is simulated, not sent to the camera");
    }

    log::info!("Reading track for id: {}", args.track_id);
    let track = TrackSource::load(&args.data_dir, &args.track_id)?;
    let orientation = match &args.orientation {
        Some(path) => TrackSource::load_orientation(path)?,
        None => OrientationPayload::zero(),
    };

    log::info!("Making the controller, and subscribing to topics");
    let factory = MessageFactory::from_config(&config, orientation);
    let controller = shared(SimulatedController::new(config.controller.clone()));
    let tick = config.controller.update_interval;

    let mut artifacts = RunArtifacts::new(&args.output, &args.track_id, args.mode, tick)?;

    let outcome = match args.mode {
        TransportMode::Direct => {
            let transport = DirectTransport::new(controller.clone());
            ReplayLoop::new(&track, &factory, transport, controller, tick)?.run()?
        }
        TransportMode::Bus => {
            let endpoint = config.broker.endpoint.as_deref().unwrap_or_default();
            let settle = config.broker.settle_interval(&config.controller);
            let transport = BusTransport::connect(
                endpoint,
                config.channels.clone(),
                settle,
                controller.clone(),
            )?;
            ReplayLoop::new(&track, &factory, transport, controller, tick)?.run()?
        }
    };

    if outcome.stats.late > 0 {
        log::warn!(
            "{} bus deliveries were not acknowledged within the settle interval",
            outcome.stats.late
        );
    }

    artifacts.finish(&outcome)?;
    log::info!("History written to {}", artifacts.history_path().display());
    let run_log = artifacts.run_log();
    log::info!(
        "Run log written to {} ({} ticks, {} dropped samples)",
        artifacts.run_log_path().display(),
        run_log.ticks,
        run_log.dropped_samples
    );
    Ok(outcome)
}
