use neurocal_core::{AppPhase, InputMode};
use neurocal_input::InputError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("focus time must be a positive number of seconds, got {0}")]
    FocusTime(f64),
    #[error("gap time must be a positive number of seconds, got {0}")]
    GapTime(f64),
    #[error("at least one calibration round is required")]
    NoRounds,
    #[error("EEG channel count must be at least 1")]
    NoChannels,
    #[error("EEG sampling rate must be at least 1 Hz")]
    SamplingRate,
    #[error("sample channel capacity must be at least 1")]
    ChannelCapacity,
}

/// Reasons a calibration start is refused. A refused start changes no state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("calibration can only start in the Calibration Phase (currently {})", .0.label())]
    WrongPhase(AppPhase),
    #[error("a calibration session is already running")]
    AlreadyRunning,
    #[error("the calibration sequence is empty")]
    EmptySequence,
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("{} hardware not connected", .0.label())]
    HardwareUnavailable(InputMode),
    #[error(transparent)]
    Input(#[from] InputError),
}
