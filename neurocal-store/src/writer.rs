use crate::{DataLayout, GazeMapping, RunIdentity, StoreError};
use log::{debug, error, info};
use neurocal_core::TrialRecord;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Destination for sealed trials.
///
/// Both calls report failure as `false` and never panic; the caller logs and
/// keeps the session going.
pub trait TrialSink {
    fn append_trial(&mut self, identity: &RunIdentity, record: &TrialRecord) -> bool;

    fn write_mapping(&mut self, identity: &RunIdentity, block: u32, mapping: &GazeMapping) -> bool;
}

/// JSONL append log, one file per calibration block.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    layout: DataLayout,
}

impl JsonlWriter {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn block_path(&self, identity: &RunIdentity, block: u32) -> PathBuf {
        self.layout
            .block_path(identity.mode, &identity.username, block)
    }

    /// Serializes, appends, flushes and fsyncs one line. Not idempotent: the
    /// same record appended twice yields two lines.
    pub fn try_append(
        &self,
        identity: &RunIdentity,
        record: &TrialRecord,
    ) -> Result<PathBuf, StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let path = self.block_path(identity, record.calibration_index);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        file.write_all(&line)
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(path)
    }

    pub fn try_write_mapping(
        &self,
        identity: &RunIdentity,
        block: u32,
        mapping: &GazeMapping,
    ) -> Result<PathBuf, StoreError> {
        let path = self
            .layout
            .mapping_path(identity.mode, &identity.username, block);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        let body = serde_json::to_vec_pretty(mapping)?;
        fs::write(&path, body).map_err(|e| StoreError::io(&path, e))?;
        Ok(path)
    }
}

impl TrialSink for JsonlWriter {
    fn append_trial(&mut self, identity: &RunIdentity, record: &TrialRecord) -> bool {
        match self.try_append(identity, record) {
            Ok(path) => {
                info!("saved circle {} data to {}", record.circle, path.display());
                debug!(
                    "  samples: starting_rest={} focus={} ending_rest={}",
                    record.samples.starting_rest.len(),
                    record.samples.focus.len(),
                    record.samples.ending_rest.len()
                );
                true
            }
            Err(e) => {
                error!("failed to save circle {} data: {e}", record.circle);
                false
            }
        }
    }

    fn write_mapping(&mut self, identity: &RunIdentity, block: u32, mapping: &GazeMapping) -> bool {
        match self.try_write_mapping(identity, block, mapping) {
            Ok(path) => {
                info!("mapping saved: {}", path.display());
                true
            }
            Err(e) => {
                error!("failed to save mapping for block {block}: {e}");
                false
            }
        }
    }
}
