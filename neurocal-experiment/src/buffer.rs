use log::warn;
use neurocal_core::{CollectionPhase, PhaseSamples, Sample, SampleShape};

/// What happened to a routed sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Stored(CollectionPhase),
    /// No phase was collecting; the sample was dropped.
    Inactive,
    /// The sample did not match the session's declared shape and was dropped.
    ShapeMismatch,
}

/// Per-phase sample lists of the one open trial.
///
/// Only the tick thread touches this store. Snapshots drain the lists in place
/// so their allocations carry over to the next trial.
#[derive(Debug)]
pub struct PhaseBuffers {
    shape: SampleShape,
    phase: Option<CollectionPhase>,
    samples: PhaseSamples,
    mismatched: u64,
}

impl PhaseBuffers {
    pub fn new(shape: SampleShape) -> Self {
        Self {
            shape,
            phase: None,
            samples: PhaseSamples::default(),
            mismatched: 0,
        }
    }

    pub fn shape(&self) -> SampleShape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: SampleShape) {
        self.shape = shape;
    }

    pub fn phase(&self) -> Option<CollectionPhase> {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Option<CollectionPhase>) {
        self.phase = phase;
    }

    pub fn route(&mut self, sample: Sample) -> RouteOutcome {
        let Some(phase) = self.phase else {
            return RouteOutcome::Inactive;
        };
        if !self.shape.accepts(&sample) {
            self.mismatched += 1;
            warn!(
                "dropping {} sample, session expects {:?}",
                SampleShape::describe(&sample),
                self.shape
            );
            return RouteOutcome::ShapeMismatch;
        }
        self.samples.get_mut(phase).push(sample);
        RouteOutcome::Stored(phase)
    }

    /// Hands out everything collected for the trial and leaves the store empty.
    pub fn snapshot_and_clear(&mut self) -> PhaseSamples {
        let mut snapshot = PhaseSamples::default();
        for phase in CollectionPhase::ALL {
            snapshot
                .get_mut(phase)
                .extend(self.samples.get_mut(phase).drain(..));
        }
        snapshot
    }

    /// Drops the open trial's samples without handing them out.
    pub fn discard(&mut self) {
        for phase in CollectionPhase::ALL {
            self.samples.get_mut(phase).clear();
        }
    }

    pub fn counts(&self) -> [usize; 3] {
        CollectionPhase::ALL.map(|p| self.samples.get(p).len())
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples rejected for their shape since the store was created.
    pub fn mismatched(&self) -> u64 {
        self.mismatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocal_core::{EegSample, GazeSample};

    fn eeg(n: usize) -> Sample {
        Sample::Eeg(EegSample {
            t: 0.0,
            ch: vec![0.0; n],
        })
    }

    #[test]
    fn drops_when_no_phase_is_active() {
        let mut buffers = PhaseBuffers::new(SampleShape::Gaze);
        let outcome = buffers.route(GazeSample::pointer(0.0, 1.0, 1.0).into());
        assert_eq!(outcome, RouteOutcome::Inactive);
        assert!(buffers.is_empty());
    }

    #[test]
    fn routes_to_active_phase_in_arrival_order() {
        let mut buffers = PhaseBuffers::new(SampleShape::Gaze);
        buffers.set_phase(Some(CollectionPhase::StartingRest));
        buffers.route(GazeSample::pointer(1.0, 0.0, 0.0).into());
        buffers.set_phase(Some(CollectionPhase::Focus));
        buffers.route(GazeSample::pointer(2.0, 0.0, 0.0).into());
        buffers.route(GazeSample::pointer(3.0, 0.0, 0.0).into());
        assert_eq!(buffers.counts(), [1, 2, 0]);

        let snapshot = buffers.snapshot_and_clear();
        let times: Vec<f64> = snapshot.focus.iter().map(Sample::timestamp).collect();
        assert_eq!(times, [2.0, 3.0]);
        assert!(buffers.is_empty());
    }

    #[test]
    fn eeg_channel_mismatch_is_dropped() {
        let mut buffers = PhaseBuffers::new(SampleShape::Eeg { channel_count: 32 });
        buffers.set_phase(Some(CollectionPhase::Focus));
        assert_eq!(buffers.route(eeg(31)), RouteOutcome::ShapeMismatch);
        assert_eq!(buffers.route(GazeSample::pointer(0.0, 1.0, 1.0).into()), RouteOutcome::ShapeMismatch);
        assert_eq!(buffers.route(eeg(32)), RouteOutcome::Stored(CollectionPhase::Focus));
        assert_eq!(buffers.counts(), [0, 1, 0]);
        assert_eq!(buffers.mismatched(), 2);
    }

    #[test]
    fn snapshot_keeps_capacity() {
        let mut buffers = PhaseBuffers::new(SampleShape::Eeg { channel_count: 2 });
        buffers.set_phase(Some(CollectionPhase::EndingRest));
        for _ in 0..100 {
            buffers.route(eeg(2));
        }
        let snapshot = buffers.snapshot_and_clear();
        assert_eq!(snapshot.ending_rest.len(), 100);
        assert!(buffers.samples.ending_rest.capacity() >= 100);
        assert!(buffers.is_empty());
    }

    #[test]
    fn discard_empties_every_phase() {
        let mut buffers = PhaseBuffers::new(SampleShape::Gaze);
        for phase in CollectionPhase::ALL {
            buffers.set_phase(Some(phase));
            buffers.route(GazeSample::pointer(0.0, 0.0, 0.0).into());
        }
        buffers.discard();
        assert_eq!(buffers.counts(), [0, 0, 0]);
    }
}
