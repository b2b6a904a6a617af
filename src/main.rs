//! PPG Biometric Monitor
//!
//! Samples a photoplethysmography front end at a fixed rate, detects heart
//! beats and derives live heart rate and time-domain HRV statistics. Results
//! are published to a message broker, kept in a small history and can be sent
//! for cloud analysis.

use anyhow::Result;
use clap::{Parser, Subcommand};
use controller::application::{AppController, FrontEnd, Mode};
use crate::core::config::MonitorConfig;
use env_logger::Env;
use log::error;
use std::path::PathBuf;
use tokio::runtime::Runtime;

/// Core utilities shared by all modules.
mod core {
    /// Application-wide constants.
    pub mod constants;
    /// Tunables of the acquisition pipeline.
    pub mod config;
    /// Input tokens and session states.
    pub mod events;
}

/// Interfaces to hardware and external services.
mod api {
    /// Analog input, display and front panel.
    pub mod peripherals;
    /// Broker, cloud analysis and history store.
    pub mod services;
}

/// Pure numeric functions.
mod math {
    /// HRV statistics.
    pub mod hrv;
    /// Peak indices to intervals and heart rates.
    pub mod intervals;
}

/// Data models of the monitor.
mod model {
    pub mod cloud;
    pub mod detector;
    pub mod history;
    pub mod hrv;
    pub mod queue;
    pub mod waveform;
}

/// Concrete collaborators.
mod components {
    pub mod broker;
    pub mod cloud;
    pub mod console;
    pub mod input;
    pub mod sampler;
    pub mod session;
    pub mod simulator;
    pub mod storage;
}

/// Session orchestration.
mod controller {
    /// Mode dispatch and wiring.
    pub mod application;
    /// Acquisition sessions.
    pub mod pipeline;
}

#[derive(Parser, Debug)]
#[command(name = "ppg-rs", version, about = "PPG heart rate and HRV monitor")]
struct Cli {
    /// JSON configuration file; unspecified fields keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Heart rate of the synthetic front end.
    #[arg(long, default_value_t = 72.0)]
    bpm: f64,

    /// Maximum beat-to-beat variation of the synthetic front end.
    #[arg(long, default_value_t = 40.0)]
    jitter_ms: f64,

    /// Uniform noise amplitude in ADC counts.
    #[arg(long, default_value_t = 200)]
    noise: i32,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Show the live heart rate until stopped.
    MeasureHr,
    /// Run a bounded HRV session, publish and store the result.
    AnalyzeHrv,
    /// Collect intervals and request a cloud readiness analysis.
    Kubios,
    /// Print the stored HRV results.
    History,
}

impl From<Command> for Mode {
    fn from(command: Command) -> Self {
        match command {
            Command::MeasureHr => Mode::MeasureHr,
            Command::AnalyzeHrv => Mode::AnalyzeHrv,
            Command::Kubios => Mode::Kubios,
            Command::History => Mode::History,
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    };
    config.validate()?;
    let front_end = FrontEnd {
        bpm: cli.bpm,
        jitter_ms: cli.jitter_ms,
        noise: cli.noise,
        seed: cli.seed,
    };

    let rt = Runtime::new()?;
    let app = AppController::new(config, front_end);
    let result = rt.block_on(app.run(cli.command.into()));
    // The stdin reader may still be parked in a blocking read.
    rt.shutdown_background();
    result
}

fn main() {
    // Initialize logger with environment-specific settings.
    env_logger::Builder::from_env(
        Env::default()
            .filter_or("PPG_LOG_LEVEL", "info")
            .write_style_or("PPG_LOG_STYLE", "always"),
    )
    .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
