use crate::ConfigError;
use neurocal_core::{InputMode, SampleShape};
use neurocal_input::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FOCUS_TIME: f64 = 3.0;
pub const DEFAULT_GAP_TIME: f64 = 2.0;
pub const EEG_DEFAULT_FOCUS_TIME: f64 = 4.0;
pub const EEG_DEFAULT_GAP_TIME: f64 = 2.0;
pub const DEFAULT_ROUNDS: usize = 5;

/// Stream format assumed for the EEG headset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EegSettings {
    pub channel_count: usize,
    pub sampling_rate: u32,
}

impl Default for EegSettings {
    fn default() -> Self {
        Self {
            channel_count: 32,
            sampling_rate: 256,
        }
    }
}

/// Rest and focus durations in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSettings {
    pub focus_time: f64,
    pub gap_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub input_mode: InputMode,
    pub focus_time: f64,
    pub gap_time: f64,
    pub rounds: usize,
    pub eeg: EegSettings,
    pub channel_capacity: usize,
    pub allow_without_hardware: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::for_mode(InputMode::default())
    }
}

impl CalibrationConfig {
    /// Defaults for `mode`; EEG runs use longer focus periods.
    pub fn for_mode(mode: InputMode) -> Self {
        let timing = Self::default_timing(mode);
        Self {
            input_mode: mode,
            focus_time: timing.focus_time,
            gap_time: timing.gap_time,
            rounds: DEFAULT_ROUNDS,
            eeg: EegSettings::default(),
            channel_capacity: DEFAULT_CAPACITY,
            allow_without_hardware: false,
        }
    }

    pub fn default_timing(mode: InputMode) -> TimingSettings {
        if mode.is_sequential() {
            TimingSettings {
                focus_time: EEG_DEFAULT_FOCUS_TIME,
                gap_time: EEG_DEFAULT_GAP_TIME,
            }
        } else {
            TimingSettings {
                focus_time: DEFAULT_FOCUS_TIME,
                gap_time: DEFAULT_GAP_TIME,
            }
        }
    }

    pub fn timing(&self) -> TimingSettings {
        TimingSettings {
            focus_time: self.focus_time,
            gap_time: self.gap_time,
        }
    }

    /// Sample layout the configured mode records when no device reports one.
    pub fn shape(&self) -> SampleShape {
        if self.input_mode.is_sequential() {
            SampleShape::Eeg {
                channel_count: self.eeg.channel_count,
            }
        } else {
            SampleShape::Gaze
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_focus_time(self.focus_time)?;
        check_gap_time(self.gap_time)?;
        if self.rounds == 0 {
            return Err(ConfigError::NoRounds);
        }
        if self.eeg.channel_count == 0 {
            return Err(ConfigError::NoChannels);
        }
        if self.eeg.sampling_rate == 0 {
            return Err(ConfigError::SamplingRate);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ChannelCapacity);
        }
        Ok(())
    }
}

pub(crate) fn check_focus_time(secs: f64) -> Result<(), ConfigError> {
    if secs.is_finite() && secs > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::FocusTime(secs))
    }
}

pub(crate) fn check_gap_time(secs: f64) -> Result<(), ConfigError> {
    if secs.is_finite() && secs > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::GapTime(secs))
    }
}
