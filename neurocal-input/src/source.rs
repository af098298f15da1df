use crate::{
    EegSource, EyeTrackerSource, InputError, PointerSource, SampleSender, SimulatedEegDevice,
    SimulatedGazeDevice,
};
use neurocal_core::{InputMode, SampleShape};

/// The input device a session records from.
pub enum InputSource {
    Pointer(PointerSource),
    EyeTracker(EyeTrackerSource),
    Eeg(EegSource),
}

impl InputSource {
    /// Source backed by a synthetic device for `mode`.
    pub fn simulated(mode: InputMode, channel_count: usize, sampling_rate: u32) -> Self {
        match mode {
            InputMode::Pointer => InputSource::Pointer(PointerSource::new()),
            InputMode::EyeTracker => InputSource::EyeTracker(EyeTrackerSource::new(Box::new(
                SimulatedGazeDevice::new(90.0),
            ))),
            InputMode::Eeg => InputSource::Eeg(EegSource::connect(Box::new(
                SimulatedEegDevice::new(channel_count, sampling_rate),
            ))),
        }
    }

    pub fn mode(&self) -> InputMode {
        match self {
            InputSource::Pointer(_) => InputMode::Pointer,
            InputSource::EyeTracker(_) => InputMode::EyeTracker,
            InputSource::Eeg(_) => InputMode::Eeg,
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            InputSource::Pointer(s) => s.is_available(),
            InputSource::EyeTracker(s) => s.is_available(),
            InputSource::Eeg(s) => s.is_available(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        match self {
            InputSource::Pointer(s) => s.is_streaming(),
            InputSource::EyeTracker(s) => s.is_streaming(),
            InputSource::Eeg(s) => s.is_streaming(),
        }
    }

    pub fn start(&mut self, sender: SampleSender) -> Result<(), InputError> {
        match self {
            InputSource::Pointer(s) => s.start(sender),
            InputSource::EyeTracker(s) => s.start(sender),
            InputSource::Eeg(s) => s.start(sender),
        }
    }

    /// Blocks until the producer has halted or the shutdown timeout passed.
    pub fn stop(&mut self) -> Result<(), InputError> {
        match self {
            InputSource::Pointer(s) => s.stop(),
            InputSource::EyeTracker(s) => s.stop(),
            InputSource::Eeg(s) => s.stop(),
        }
    }

    pub fn sampling_rate(&self) -> Option<u32> {
        match self {
            InputSource::Eeg(s) => Some(s.sampling_rate()),
            _ => None,
        }
    }

    pub fn channel_count(&self) -> Option<usize> {
        match self {
            InputSource::Eeg(s) => Some(s.channel_count()),
            _ => None,
        }
    }

    pub fn shape(&self) -> SampleShape {
        match self {
            InputSource::Eeg(s) => SampleShape::Eeg {
                channel_count: s.channel_count(),
            },
            _ => SampleShape::Gaze,
        }
    }

    /// Pointer move from the presentation layer; ignored by other sources.
    pub fn on_pointer_move(&mut self, x: f64, y: f64) {
        if let InputSource::Pointer(s) = self {
            s.on_move(x, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_channel;
    use std::time::Duration;

    #[test]
    fn simulated_sources_match_mode() {
        for mode in InputMode::ALL {
            let source = InputSource::simulated(mode, 8, 128);
            assert_eq!(source.mode(), mode);
            assert!(source.is_available());
        }
    }

    #[test]
    fn only_eeg_declares_channels() {
        let eeg = InputSource::simulated(InputMode::Eeg, 8, 128);
        assert_eq!(eeg.channel_count(), Some(8));
        assert_eq!(eeg.sampling_rate(), Some(128));
        assert_eq!(eeg.shape(), SampleShape::Eeg { channel_count: 8 });

        let pointer = InputSource::simulated(InputMode::Pointer, 8, 128);
        assert_eq!(pointer.channel_count(), None);
        assert_eq!(pointer.shape(), SampleShape::Gaze);
    }

    #[test]
    fn simulated_eeg_streams_until_stopped() {
        let mut source = InputSource::simulated(InputMode::Eeg, 8, 512);
        let (tx, rx) = sample_channel(4096);
        source.start(tx).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        source.stop().unwrap();
        assert!(!source.is_streaming());

        let delivered = rx.drain();
        assert!(!delivered.is_empty());
        assert!(delivered.iter().all(|s| source.shape().accepts(s)));
        std::thread::sleep(Duration::from_millis(20));
        assert!(rx.drain().is_empty());
    }
}
