use thiserror::Error;

/// Failure reported by a vendor device binding
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device not connected")]
    NotConnected,
    #[error("device read failed: {0}")]
    Read(String),
    #[error("device command failed: {0}")]
    Command(String),
}

/// Failure of an input source adapter call
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{0} hardware not connected")]
    Unavailable(&'static str),
    #[error("failed to start streaming: {0}")]
    StreamStart(String),
    #[error("failed to stop streaming: {0}")]
    StreamStop(String),
    #[error("stream already running")]
    AlreadyStreaming,
    #[error(transparent)]
    Device(#[from] DeviceError),
}
