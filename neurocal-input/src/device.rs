use crate::DeviceError;
use std::time::Duration;

/// Raw gaze event from an eye-tracker SDK, normalized display-area coordinates per eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawGaze {
    pub t: f64,
    pub left: Option<[f64; 2]>,
    pub right: Option<[f64; 2]>,
}

/// Binding to an eye-tracker SDK.
pub trait GazeDevice: Send + 'static {
    fn model(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// Waits up to `timeout` for the next gaze event.
    fn poll(&mut self, timeout: Duration) -> Result<Option<RawGaze>, DeviceError>;
}

/// Binding to an EEG amplifier SDK.
pub trait EegDevice: Send + 'static {
    fn model(&self) -> &str;

    fn connect(&mut self) -> Result<(), DeviceError>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn sampling_rate(&self) -> u32;

    fn channel_count(&self) -> usize;

    fn start_acquisition(&mut self) -> Result<(), DeviceError>;

    /// Scans acquired since the last call, one `Vec` of channel values per scan.
    /// An empty batch means nothing new yet.
    fn read_scans(&mut self) -> Result<Vec<Vec<f64>>, DeviceError>;

    fn stop_acquisition(&mut self) -> Result<(), DeviceError>;
}
