//! Input source adapters.
//!
//! Every device is wrapped behind [`InputSource`], which pushes samples into a
//! bounded channel. The session controller drains the receiving end once per
//! tick; adapters know nothing about trials or phases.

pub mod channel;
pub mod device;
pub mod eeg;
pub mod error;
pub mod eye_tracker;
pub mod pointer;
pub mod simulated;
pub mod source;
mod worker;

pub use channel::{DEFAULT_CAPACITY, SampleReceiver, SampleSender, sample_channel};
pub use device::{EegDevice, GazeDevice, RawGaze};
pub use eeg::EegSource;
pub use error::{DeviceError, InputError};
pub use eye_tracker::EyeTrackerSource;
pub use pointer::PointerSource;
pub use simulated::{SimulatedEegDevice, SimulatedGazeDevice};
pub use source::InputSource;
