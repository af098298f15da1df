use serde::{Deserialize, Serialize};

/// Seconds since the UNIX epoch, as stored in sample and record timestamps.
pub fn wall_clock_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Pointer or eye-tracker observation.
///
/// Pointer samples carry pixel coordinates in `x`/`y` and no raw eye points.
/// Eye-tracker samples carry normalized display-area coordinates; `x`/`y` is the
/// two-eye average and is only present when both eyes were valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub t: f64,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub left: Option<[f64; 2]>,
    #[serde(default)]
    pub right: Option<[f64; 2]>,
}

impl GazeSample {
    pub fn pointer(t: f64, x: f64, y: f64) -> Self {
        Self {
            t,
            x: Some(x),
            y: Some(y),
            left: None,
            right: None,
        }
    }

    pub fn from_eyes(t: f64, left: Option<[f64; 2]>, right: Option<[f64; 2]>) -> Self {
        let left = left.filter(|p| p.iter().all(|v| v.is_finite()));
        let right = right.filter(|p| p.iter().all(|v| v.is_finite()));
        let (x, y) = match (left, right) {
            (Some(l), Some(r)) => (Some((l[0] + r[0]) / 2.0), Some((l[1] + r[1]) / 2.0)),
            _ => (None, None),
        };
        Self {
            t,
            x,
            y,
            left,
            right,
        }
    }

    pub fn point(&self) -> Option<(f64, f64)> {
        self.x.zip(self.y)
    }
}

/// One multi-channel EEG scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegSample {
    pub t: f64,
    pub ch: Vec<f64>,
}

/// Serialized without a tag: EEG samples are recognised by their `ch` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sample {
    Eeg(EegSample),
    Gaze(GazeSample),
}

impl Sample {
    pub fn timestamp(&self) -> f64 {
        match self {
            Sample::Eeg(s) => s.t,
            Sample::Gaze(s) => s.t,
        }
    }

    pub fn as_gaze(&self) -> Option<&GazeSample> {
        match self {
            Sample::Gaze(s) => Some(s),
            Sample::Eeg(_) => None,
        }
    }
}

impl From<GazeSample> for Sample {
    fn from(s: GazeSample) -> Self {
        Sample::Gaze(s)
    }
}

impl From<EegSample> for Sample {
    fn from(s: EegSample) -> Self {
        Sample::Eeg(s)
    }
}

/// The sample layout a session accepts; anything else is dropped before buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleShape {
    Gaze,
    Eeg { channel_count: usize },
}

impl SampleShape {
    pub fn accepts(&self, sample: &Sample) -> bool {
        match (self, sample) {
            (SampleShape::Gaze, Sample::Gaze(_)) => true,
            (SampleShape::Eeg { channel_count }, Sample::Eeg(s)) => s.ch.len() == *channel_count,
            _ => false,
        }
    }

    pub fn describe(sample: &Sample) -> String {
        match sample {
            Sample::Gaze(_) => "gaze".to_string(),
            Sample::Eeg(s) => format!("eeg[{}]", s.ch.len()),
        }
    }
}
