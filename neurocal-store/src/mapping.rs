use neurocal_core::{Sample, TargetIndex, TrialRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean gaze point recorded while one target was in focus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetMean {
    pub avg_x: f64,
    pub avg_y: f64,
    pub samples: usize,
}

/// Per-target gaze averages for one calibration block, keyed by circle number.
/// Targets without a single two-eye sample are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GazeMapping {
    targets: BTreeMap<u8, TargetMean>,
}

impl GazeMapping {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TrialRecord>) -> Self {
        let mut sums: BTreeMap<u8, (f64, f64, usize)> = BTreeMap::new();
        for record in records {
            let points = record
                .samples
                .focus
                .iter()
                .filter_map(Sample::as_gaze)
                .filter_map(|g| g.point());
            for (x, y) in points {
                let entry = sums.entry(record.circle.get()).or_default();
                entry.0 += x;
                entry.1 += y;
                entry.2 += 1;
            }
        }
        let targets = sums
            .into_iter()
            .map(|(circle, (sx, sy, n))| {
                let mean = TargetMean {
                    avg_x: sx / n as f64,
                    avg_y: sy / n as f64,
                    samples: n,
                };
                (circle, mean)
            })
            .collect();
        Self { targets }
    }

    pub fn get(&self, target: TargetIndex) -> Option<&TargetMean> {
        self.targets.get(&target.get())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
