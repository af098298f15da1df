pub mod mode;
pub mod phase;
pub mod sample;
pub mod stimulus;
pub mod trial;

pub use mode::{InputMode, StatusLevel};
pub use phase::{AppPhase, CollectionPhase};
pub use sample::{EegSample, GazeSample, Sample, SampleShape, wall_clock_secs};
pub use stimulus::{StimulusLayout, TARGET_COUNT, TargetIndex};
pub use trial::{PhaseSamples, SealedTrial, TrialMeta, TrialRecord, TrialState};
