pub mod manual;
pub mod stats;
pub mod timer;

pub use manual::ManualTimer;
pub use stats::{TickRecorder, TickStats};
pub use timer::{HighPrecisionTimer, Timer};
