use crate::StoreError;
use log::{error, info};
use neurocal_core::{CollectionPhase, TrialRecord};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const REQUIRED_FIELDS: [&str; 8] = [
    "username",
    "session_id",
    "calibration_index",
    "circle",
    "starting_rest",
    "focus",
    "ending_rest",
    "meta",
];

fn lines(path: &Path) -> Result<impl Iterator<Item = (usize, String)>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    Ok(BufReader::new(file)
        .lines()
        .enumerate()
        .filter_map(|(i, line)| line.ok().map(|l| (i + 1, l)))
        .filter(|(_, l)| !l.trim().is_empty()))
}

/// Reads every parseable trial line; malformed lines are logged and skipped.
pub fn load_trials(path: impl AsRef<Path>) -> Result<Vec<TrialRecord>, StoreError> {
    let path = path.as_ref();
    let mut trials = Vec::new();
    for (line_no, line) in lines(path)? {
        match serde_json::from_str::<TrialRecord>(line.trim()) {
            Ok(record) => trials.push(record),
            Err(e) => error!("{}: error parsing line {line_no}: {e}", path.display()),
        }
    }
    Ok(trials)
}

/// Checks that every line carries the required fields, that phase entries are
/// arrays, and that EEG samples match the declared channel count.
pub fn validate_file(path: impl AsRef<Path>) -> Result<usize, StoreError> {
    let path = path.as_ref();
    let invalid = |reason: String| StoreError::Invalid {
        path: path.to_path_buf(),
        reason,
    };

    let mut entries = 0;
    for (line_no, line) in lines(path)? {
        let entry: Value = serde_json::from_str(line.trim())
            .map_err(|e| invalid(format!("line {line_no}: {e}")))?;
        for field in REQUIRED_FIELDS {
            if entry.get(field).is_none() {
                return Err(invalid(format!("line {line_no}: missing field '{field}'")));
            }
        }
        let channel_count = entry.get("channel_count").and_then(Value::as_u64);
        for phase in CollectionPhase::ALL {
            let Some(samples) = entry[phase.as_str()].as_array() else {
                return Err(invalid(format!(
                    "line {line_no}: '{phase}' must be a list"
                )));
            };
            let Some(expected) = channel_count else {
                continue;
            };
            for sample in samples {
                let got = sample.get("ch").and_then(Value::as_array).map_or(0, Vec::len);
                if got as u64 != expected {
                    return Err(invalid(format!(
                        "line {line_no}, {phase}: channel count mismatch (expected {expected}, got {got})"
                    )));
                }
            }
        }
        entries += 1;
    }

    if entries == 0 {
        return Err(invalid("file is empty".into()));
    }
    info!("{} is valid ({entries} entries)", path.display());
    Ok(entries)
}

/// Sample counts for one trial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialCounts {
    pub circle: u8,
    pub starting_rest: usize,
    pub focus: usize,
    pub ending_rest: usize,
}

impl TrialCounts {
    pub fn total(&self) -> usize {
        self.starting_rest + self.focus + self.ending_rest
    }
}

/// Per-trial breakdown of a block file
#[derive(Debug, Clone, PartialEq)]
pub struct FileStats {
    pub channel_count: Option<usize>,
    pub sampling_rate: Option<u32>,
    pub trials: Vec<TrialCounts>,
}

impl FileStats {
    pub fn from_records(records: &[TrialRecord]) -> Self {
        let first = records.first();
        Self {
            channel_count: first.and_then(|r| r.channel_count),
            sampling_rate: first.and_then(|r| r.sampling_rate),
            trials: records
                .iter()
                .map(|r| TrialCounts {
                    circle: r.circle.get(),
                    starting_rest: r.samples.starting_rest.len(),
                    focus: r.samples.focus.len(),
                    ending_rest: r.samples.ending_rest.len(),
                })
                .collect(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_records(&load_trials(path)?))
    }

    pub fn total_samples(&self) -> usize {
        self.trials.iter().map(TrialCounts::total).sum()
    }

    /// Recording length implied by the sample count, EEG files only.
    pub fn duration_secs(&self) -> Option<f64> {
        self.sampling_rate
            .filter(|&r| r > 0)
            .map(|r| self.total_samples() as f64 / r as f64)
    }
}
