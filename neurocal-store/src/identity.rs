use neurocal_core::{InputMode, SealedTrial, TrialRecord};

/// Short random session id, eight hex characters.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// EEG stream format recorded on every EEG trial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EegFormat {
    pub channel_count: usize,
    pub sampling_rate: u32,
}

/// Who and what a session records; combined with a trial's block index it
/// determines the target file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunIdentity {
    pub username: String,
    pub session_id: String,
    pub mode: InputMode,
    pub eeg: Option<EegFormat>,
}

impl RunIdentity {
    pub fn new(username: impl Into<String>, mode: InputMode, eeg: Option<EegFormat>) -> Self {
        Self {
            username: username.into(),
            session_id: new_session_id(),
            mode,
            eeg: eeg.filter(|_| mode.is_sequential()),
        }
    }

    pub fn record(&self, trial: SealedTrial) -> TrialRecord {
        TrialRecord {
            username: self.username.clone(),
            session_id: self.session_id.clone(),
            calibration_index: trial.calibration_index,
            circle: trial.target,
            channel_count: self.eeg.map(|f| f.channel_count),
            sampling_rate: self.eeg.map(|f| f.sampling_rate),
            samples: trial.samples,
            meta: trial.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocal_core::{PhaseSamples, TargetIndex, TrialMeta};

    fn sealed() -> SealedTrial {
        SealedTrial {
            target: TargetIndex::new(5).unwrap(),
            calibration_index: 2,
            position: 9,
            samples: PhaseSamples::default(),
            meta: TrialMeta {
                gap_time: 2.0,
                focus_time: 4.0,
                timestamp: 1.0,
            },
        }
    }

    #[test]
    fn session_ids_are_eight_chars() {
        let a = new_session_id();
        let b = new_session_id();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn eeg_format_only_kept_for_eeg_runs() {
        let format = EegFormat {
            channel_count: 32,
            sampling_rate: 256,
        };
        let eeg = RunIdentity::new("ada", InputMode::Eeg, Some(format));
        let record = eeg.record(sealed());
        assert_eq!(record.channel_count, Some(32));
        assert_eq!(record.sampling_rate, Some(256));
        assert_eq!(record.circle.get(), 5);
        assert_eq!(record.calibration_index, 2);

        let pointer = RunIdentity::new("ada", InputMode::Pointer, Some(format));
        assert_eq!(pointer.record(sealed()).channel_count, None);
    }
}
