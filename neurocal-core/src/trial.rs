use crate::{CollectionPhase, Sample, TargetIndex};
use serde::{Deserialize, Serialize};

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Idle,
    StartingRest,
    Focus,
    EndingRest,
    Complete,
}

impl TrialState {
    /// Collection phase that incoming samples are routed to in this state.
    pub fn collection_phase(&self) -> Option<CollectionPhase> {
        match self {
            TrialState::StartingRest => Some(CollectionPhase::StartingRest),
            TrialState::Focus => Some(CollectionPhase::Focus),
            TrialState::EndingRest => Some(CollectionPhase::EndingRest),
            TrialState::Idle | TrialState::Complete => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.collection_phase().is_some()
    }
}

/// Samples of one trial, keyed by collection phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseSamples {
    pub starting_rest: Vec<Sample>,
    pub focus: Vec<Sample>,
    pub ending_rest: Vec<Sample>,
}

impl PhaseSamples {
    pub fn get(&self, phase: CollectionPhase) -> &[Sample] {
        match phase {
            CollectionPhase::StartingRest => &self.starting_rest,
            CollectionPhase::Focus => &self.focus,
            CollectionPhase::EndingRest => &self.ending_rest,
        }
    }

    pub fn get_mut(&mut self, phase: CollectionPhase) -> &mut Vec<Sample> {
        match phase {
            CollectionPhase::StartingRest => &mut self.starting_rest,
            CollectionPhase::Focus => &mut self.focus,
            CollectionPhase::EndingRest => &mut self.ending_rest,
        }
    }

    pub fn total(&self) -> usize {
        self.starting_rest.len() + self.focus.len() + self.ending_rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Timing settings in force when a trial was flushed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialMeta {
    pub gap_time: f64,
    pub focus_time: f64,
    pub timestamp: f64,
}

/// A finished trial handed from the state machine to persistence
#[derive(Debug, Clone, PartialEq)]
pub struct SealedTrial {
    pub target: TargetIndex,
    pub calibration_index: u32,
    /// Position of the trial in the session sequence, zero-based.
    pub position: usize,
    pub samples: PhaseSamples,
    pub meta: TrialMeta,
}

/// One persisted JSONL line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub username: String,
    pub session_id: String,
    pub calibration_index: u32,
    pub circle: TargetIndex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_rate: Option<u32>,
    #[serde(flatten)]
    pub samples: PhaseSamples,
    pub meta: TrialMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EegSample, GazeSample};

    #[test]
    fn only_collecting_states_are_active() {
        assert!(!TrialState::Idle.is_active());
        assert!(!TrialState::Complete.is_active());
        assert_eq!(
            TrialState::Focus.collection_phase(),
            Some(CollectionPhase::Focus)
        );
    }

    #[test]
    fn eeg_record_serializes_flat_phase_arrays() {
        let mut samples = PhaseSamples::default();
        samples
            .get_mut(CollectionPhase::Focus)
            .push(Sample::Eeg(EegSample { t: 2.0, ch: vec![1.0, 2.0] }));
        let record = TrialRecord {
            username: "ada".into(),
            session_id: "abcd1234".into(),
            calibration_index: 1,
            circle: TargetIndex::new(3).unwrap(),
            channel_count: Some(2),
            sampling_rate: Some(256),
            samples,
            meta: TrialMeta {
                gap_time: 2.0,
                focus_time: 4.0,
                timestamp: 100.0,
            },
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["circle"], 3);
        assert_eq!(value["sampling_rate"], 256);
        assert_eq!(value["focus"][0]["ch"][1], 2.0);
        assert!(value["starting_rest"].as_array().unwrap().is_empty());
        assert_eq!(value["meta"]["focus_time"], 4.0);

        let back: TrialRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn gaze_record_omits_eeg_fields() {
        let mut samples = PhaseSamples::default();
        samples
            .starting_rest
            .push(Sample::Gaze(GazeSample::pointer(1.0, 5.0, 6.0)));
        let record = TrialRecord {
            username: "ada".into(),
            session_id: "abcd1234".into(),
            calibration_index: 2,
            circle: TargetIndex::new(8).unwrap(),
            channel_count: None,
            sampling_rate: None,
            samples,
            meta: TrialMeta {
                gap_time: 0.5,
                focus_time: 1.0,
                timestamp: 100.0,
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("channel_count").is_none());
        assert!(value.get("sampling_rate").is_none());
        assert_eq!(value["starting_rest"][0]["x"], 5.0);
        assert!(value["starting_rest"][0]["left"].is_null());
        assert_eq!(value["starting_rest"].as_array().unwrap().len(), 1);
    }
}
