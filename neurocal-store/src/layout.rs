use neurocal_core::InputMode;
use std::path::{Path, PathBuf};

/// Where calibration files live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// One root folder per recording modality.
    pub fn modality_dir(mode: InputMode) -> &'static str {
        if mode.is_sequential() {
            "eeg_calibration"
        } else {
            "calibration_logs"
        }
    }

    pub fn user_dir(&self, mode: InputMode, username: &str) -> PathBuf {
        self.root.join(Self::modality_dir(mode)).join(username)
    }

    pub fn block_path(&self, mode: InputMode, username: &str, block: u32) -> PathBuf {
        self.user_dir(mode, username).join(format!("{block}.jsonl"))
    }

    pub fn mapping_path(&self, mode: InputMode, username: &str, block: u32) -> PathBuf {
        self.user_dir(mode, username)
            .join(format!("mapping_{block}.json"))
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(".")
    }
}
