use crate::{InputError, SampleSender};
use neurocal_core::{GazeSample, wall_clock_secs};

/// Mouse cursor input. Move events arrive synchronously on the tick thread.
#[derive(Debug, Default)]
pub struct PointerSource {
    sender: Option<SampleSender>,
    last: Option<(f64, f64)>,
}

impl PointerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        true
    }

    pub fn is_streaming(&self) -> bool {
        self.sender.is_some()
    }

    pub fn start(&mut self, sender: SampleSender) -> Result<(), InputError> {
        if self.sender.is_some() {
            return Err(InputError::AlreadyStreaming);
        }
        self.sender = Some(sender);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), InputError> {
        self.sender = None;
        Ok(())
    }

    /// Last known cursor position, tracked whether or not a session is streaming.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.last
    }

    pub fn on_move(&mut self, x: f64, y: f64) {
        self.on_move_at(wall_clock_secs(), x, y);
    }

    pub fn on_move_at(&mut self, t: f64, x: f64, y: f64) {
        self.last = Some((x, y));
        if let Some(sender) = &self.sender {
            if !sender.push(GazeSample::pointer(t, x, y)) {
                self.sender = None;
            }
        }
    }
}
