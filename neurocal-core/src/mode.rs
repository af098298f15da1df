use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which device drives a calibration session
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    Pointer,
    EyeTracker,
    Eeg,
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::Pointer
    }
}

impl InputMode {
    pub const ALL: [InputMode; 3] = [InputMode::Pointer, InputMode::EyeTracker, InputMode::Eeg];

    pub fn label(&self) -> &'static str {
        match self {
            InputMode::Pointer => "Mouse Cursor",
            InputMode::EyeTracker => "Tobii Eye Tracker",
            InputMode::Eeg => "EEG Headset",
        }
    }

    /// EEG visits targets in run-length blocks instead of shuffled rounds.
    pub fn is_sequential(&self) -> bool {
        matches!(self, InputMode::Eeg)
    }

    pub fn records_gaze(&self) -> bool {
        !self.is_sequential()
    }

    pub fn needs_hardware(&self) -> bool {
        !matches!(self, InputMode::Pointer)
    }
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            InputMode::Pointer => "pointer",
            InputMode::EyeTracker => "eye-tracker",
            InputMode::Eeg => "eeg",
        })
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pointer" | "mouse" => Ok(InputMode::Pointer),
            "eye-tracker" | "eyetracker" | "tobii" => Ok(InputMode::EyeTracker),
            "eeg" => Ok(InputMode::Eeg),
            other => Err(format!(
                "unknown input mode '{other}' (expected pointer, eye-tracker or eeg)"
            )),
        }
    }
}

/// Severity of a status notification shown by the presentation layer
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Info => "info",
            StatusLevel::Success => "success",
            StatusLevel::Warning => "warning",
            StatusLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_aliases() {
        assert_eq!("mouse".parse::<InputMode>(), Ok(InputMode::Pointer));
        assert_eq!("Tobii".parse::<InputMode>(), Ok(InputMode::EyeTracker));
        assert_eq!("EEG".parse::<InputMode>(), Ok(InputMode::Eeg));
        assert!("keyboard".parse::<InputMode>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for mode in InputMode::ALL {
            assert_eq!(mode.to_string().parse::<InputMode>(), Ok(mode));
        }
    }

    #[test]
    fn only_eeg_is_sequential() {
        assert!(InputMode::Eeg.is_sequential());
        assert!(InputMode::Pointer.records_gaze());
        assert!(InputMode::EyeTracker.records_gaze());
        assert!(!InputMode::Pointer.needs_hardware());
    }
}
