pub mod buffer;
pub mod config;
pub mod dwell;
pub mod error;
pub mod sequence;
pub mod session;
pub mod state;

pub use buffer::{PhaseBuffers, RouteOutcome};
pub use config::{CalibrationConfig, EegSettings, TimingSettings};
pub use dwell::DwellTracker;
pub use error::{ConfigError, SessionError};
pub use session::{Presenter, SessionController, SessionStats};
pub use state::{TrialEvent, TrialStateMachine};
