use serde::{Deserialize, Serialize};

/// Application phase selected from the control panel
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    Testing,
    Calibration,
    Start,
}

impl Default for AppPhase {
    fn default() -> Self {
        AppPhase::Testing
    }
}

impl AppPhase {
    pub const ALL: [AppPhase; 3] = [AppPhase::Testing, AppPhase::Calibration, AppPhase::Start];

    pub fn allows_calibration(&self) -> bool {
        matches!(self, Self::Calibration)
    }

    /// Free pointer/gaze hover feedback is only shown while testing.
    pub fn tracks_hover(&self) -> bool {
        matches!(self, Self::Testing)
    }

    pub fn next(&self) -> Option<Self> {
        use AppPhase::*;
        Some(match self {
            Testing => Calibration,
            Calibration => Start,
            Start => return None,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppPhase::Testing => "Testing Phase",
            AppPhase::Calibration => "Calibration Phase",
            AppPhase::Start => "Start Phase",
        }
    }
}

/// Collection phase within one trial. Samples are only buffered while one is active.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPhase {
    StartingRest,
    Focus,
    EndingRest,
}

impl CollectionPhase {
    pub const ALL: [CollectionPhase; 3] = [
        CollectionPhase::StartingRest,
        CollectionPhase::Focus,
        CollectionPhase::EndingRest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartingRest => "starting_rest",
            Self::Focus => "focus",
            Self::EndingRest => "ending_rest",
        }
    }

    pub fn is_rest(&self) -> bool {
        !matches!(self, Self::Focus)
    }
}

impl std::fmt::Display for CollectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
