use anyhow::{Context, Result};
use neurocal_experiment::CalibrationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Recorder settings, read from an optional JSON file and then overridden
/// from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub username: Option<String>,
    pub data_dir: PathBuf,
    pub tick_hz: f64,
    pub width: f64,
    pub height: f64,
    pub calibration: CalibrationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            username: None,
            data_dir: PathBuf::from("."),
            tick_hz: 60.0,
            width: 1200.0,
            height: 800.0,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn tick_interval_ns(&self) -> u64 {
        (1e9 / self.tick_hz.clamp(1.0, 1000.0)) as u64
    }
}
