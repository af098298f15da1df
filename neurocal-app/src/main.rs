mod app;
mod config;
mod presenter;

use anyhow::{Context, Result};
use clap::Parser;
use app::App;
use config::AppConfig;
use neurocal_core::InputMode;
use neurocal_store::{FileStats, validate_file};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "neurocal", about = "Gaze and EEG calibration recorder")]
struct Cli {
    /// Subject identifier; names the per-user data folder
    #[arg(long, short)]
    user: Option<String>,

    /// Input mode: pointer, eye-tracker or eeg
    #[arg(long, short)]
    mode: Option<InputMode>,

    /// Calibration rounds (blocks of eight trials)
    #[arg(long)]
    rounds: Option<usize>,

    /// Focus period in seconds
    #[arg(long)]
    focus_time: Option<f64>,

    /// Rest period before and after each focus, in seconds
    #[arg(long)]
    gap_time: Option<f64>,

    /// Root directory for recorded data
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON settings file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Record even when the device is not connected
    #[arg(long)]
    allow_without_hardware: bool,

    /// Stop the session after this many seconds
    #[arg(long)]
    max_seconds: Option<f64>,

    /// Check a recorded block file, print its statistics and exit
    #[arg(long, value_name = "FILE")]
    validate: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(user) = &self.user {
            config.username = Some(user.clone());
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        let calibration = &mut config.calibration;
        if let Some(mode) = self.mode {
            if mode != calibration.input_mode {
                let timing = neurocal_experiment::CalibrationConfig::default_timing(mode);
                calibration.focus_time = timing.focus_time;
                calibration.gap_time = timing.gap_time;
            }
            calibration.input_mode = mode;
        }
        if let Some(rounds) = self.rounds {
            calibration.rounds = rounds;
        }
        if let Some(secs) = self.focus_time {
            calibration.focus_time = secs;
        }
        if let Some(secs) = self.gap_time {
            calibration.gap_time = secs;
        }
        if self.allow_without_hardware {
            calibration.allow_without_hardware = true;
        }
    }
}

fn validate(path: &Path) -> Result<()> {
    let entries = validate_file(path)?;
    let stats = FileStats::from_path(path)?;
    println!("{}: {entries} valid entries", path.display());
    if let (Some(ch), Some(rate)) = (stats.channel_count, stats.sampling_rate) {
        println!("  format: {ch} channels @ {rate} Hz");
    }
    for (i, trial) in stats.trials.iter().enumerate() {
        println!(
            "  trial {:>3}  circle {}  starting_rest {:>6}  focus {:>6}  ending_rest {:>6}",
            i + 1,
            trial.circle,
            trial.starting_rest,
            trial.focus,
            trial.ending_rest
        );
    }
    println!("  total samples: {}", stats.total_samples());
    if let Some(secs) = stats.duration_secs() {
        println!("  duration: {secs:.2} s");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Some(path) = &cli.validate {
        return validate(path);
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    cli.apply(&mut config);
    let username = config
        .username
        .clone()
        .context("a username is required (--user or \"username\" in the config file)")?;

    let app = App::new(config, username, cli.max_seconds)?;
    app.run()?;

    Ok(())
}
