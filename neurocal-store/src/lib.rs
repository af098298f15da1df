//! Append-only trial storage.
//!
//! Each calibration block gets one JSONL file under
//! `<root>/<modality>/<username>/<block>.jsonl`; every completed trial appends
//! one line and is synced to disk before the append reports success.

pub mod error;
pub mod identity;
pub mod layout;
pub mod mapping;
pub mod reader;
pub mod writer;

pub use error::StoreError;
pub use identity::{EegFormat, RunIdentity, new_session_id};
pub use layout::DataLayout;
pub use mapping::{GazeMapping, TargetMean};
pub use reader::{FileStats, TrialCounts, load_trials, validate_file};
pub use writer::{JsonlWriter, TrialSink};
