use crate::Timer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Clock that only moves when told to. Clones share the same time, so a test can
/// keep one handle and advance the clock seen by the state machine.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }

    pub fn set_ns(&self, ns: u64) {
        self.now.store(ns, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    /// Sleeping advances the shared clock instead of blocking.
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let a = ManualTimer::new();
        let b = a.clone();
        a.advance_secs(1.5);
        assert_eq!(b.now_ns(), 1_500_000_000);
        b.sleep(Duration::from_millis(500));
        assert_eq!(a.elapsed(0), Duration::from_secs(2));
    }
}
