use std::collections::VecDeque;
use std::time::Duration;

/// Summary of scheduler tick intervals
#[derive(Debug, Clone, PartialEq)]
pub struct TickStats {
    pub average_tick_ns: f64,
    pub jitter_ns: f64,
    pub min_tick_ns: f64,
    pub max_tick_ns: f64,
    pub effective_hz: f64,
}

/// Rolling window of tick intervals, used to report how steadily the tick loop ran.
#[derive(Debug, Clone)]
pub struct TickRecorder {
    intervals: VecDeque<Duration>,
    max_samples: usize,
}

impl TickRecorder {
    pub fn new(max_samples: usize) -> Self {
        Self {
            intervals: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record(&mut self, interval: Duration) {
        if self.intervals.len() >= self.max_samples {
            self.intervals.pop_front();
        }
        self.intervals.push_back(interval);
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn stats(&self) -> TickStats {
        if self.intervals.is_empty() {
            return TickStats {
                average_tick_ns: 0.0,
                jitter_ns: 0.0,
                min_tick_ns: 0.0,
                max_tick_ns: 0.0,
                effective_hz: 0.0,
            };
        }
        let times: Vec<f64> = self
            .intervals
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        TickStats {
            average_tick_ns: avg,
            jitter_ns: var.sqrt(),
            min_tick_ns: times.iter().copied().fold(f64::INFINITY, f64::min),
            max_tick_ns: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            effective_hz: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

impl Default for TickRecorder {
    fn default() -> Self {
        Self::new(1000)
    }
}
