//! Cosmetic focus-progress signal shown while a target is lit.
//!
//! Progress never gates a phase transition; it only drives the presenter.

/// Gaze within this many pixels of the target center counts as dwelling on it.
pub const DWELL_RADIUS_PX: f64 = 80.0;
/// Continuous dwell needed before progress starts to move.
pub const DWELL_THRESHOLD_SECS: f64 = 1.5;
/// Fraction of the focus period after which non-gaze progress starts to ramp.
pub const RAMP_TRIGGER_RATIO: f64 = 0.83;

/// Tracks how long gaze has stayed on the lit target without interruption.
#[derive(Debug, Clone, Default)]
pub struct DwellTracker {
    since_ns: Option<u64>,
}

impl DwellTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one gaze observation taken at `now_ns`.
    pub fn observe(&mut self, on_target: bool, now_ns: u64) {
        if !on_target {
            self.since_ns = None;
        } else if self.since_ns.is_none() {
            self.since_ns = Some(now_ns);
        }
    }

    pub fn reset(&mut self) {
        self.since_ns = None;
    }

    pub fn is_dwelling(&self) -> bool {
        self.since_ns.is_some()
    }

    pub fn dwell_secs(&self, now_ns: u64) -> f64 {
        self.since_ns
            .map_or(0.0, |since| now_ns.saturating_sub(since) as f64 / 1e9)
    }

    pub fn progress(&self, now_ns: u64, focus_time: f64) -> f64 {
        dwell_progress(self.dwell_secs(now_ns), focus_time)
    }
}

/// Zero below the dwell threshold, then linear up to the end of the focus period.
pub fn dwell_progress(dwell_secs: f64, focus_time: f64) -> f64 {
    if dwell_secs < DWELL_THRESHOLD_SECS {
        return 0.0;
    }
    let span = focus_time - DWELL_THRESHOLD_SECS;
    if span <= 0.0 {
        return 1.0;
    }
    ((dwell_secs - DWELL_THRESHOLD_SECS) / span).clamp(0.0, 1.0)
}

/// Time-driven progress for pointer and EEG sessions.
pub fn ramp_progress(elapsed_secs: f64, focus_time: f64) -> f64 {
    let trigger = focus_time * RAMP_TRIGGER_RATIO;
    if elapsed_secs < trigger {
        return 0.0;
    }
    let span = (focus_time - trigger).max(0.001);
    ((elapsed_secs - trigger) / span).clamp(0.0, 1.0)
}
