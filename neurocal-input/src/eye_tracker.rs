use crate::worker::{STOP_TIMEOUT, StreamWorker};
use crate::{GazeDevice, InputError, SampleSender};
use log::{error, info, warn};
use neurocal_core::GazeSample;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

const POLL_TIMEOUT: Duration = Duration::from_millis(20);
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Eye-tracker input. A producer thread polls the device and pushes gaze samples.
pub struct EyeTrackerSource {
    device: Option<Arc<Mutex<Box<dyn GazeDevice>>>>,
    worker: Option<StreamWorker>,
}

impl EyeTrackerSource {
    pub fn new(device: Box<dyn GazeDevice>) -> Self {
        Self {
            device: Some(Arc::new(Mutex::new(device))),
            worker: None,
        }
    }

    /// No SDK or no tracker found.
    pub fn missing() -> Self {
        Self {
            device: None,
            worker: None,
        }
    }

    /// Never waits on a poll in progress: a tracker busy with the running
    /// stream counts as connected, one held by an abandoned stream does not.
    pub fn is_available(&self) -> bool {
        let Some(device) = &self.device else {
            return false;
        };
        match device.try_lock() {
            Ok(d) => d.is_connected(),
            Err(TryLockError::WouldBlock) => self.is_streaming(),
            Err(TryLockError::Poisoned(_)) => false,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    pub fn start(&mut self, sender: SampleSender) -> Result<(), InputError> {
        if self.worker.is_some() {
            return Err(InputError::AlreadyStreaming);
        }
        if !self.is_available() {
            error!("cannot start tracking: eye tracker unavailable");
            return Err(InputError::Unavailable("eye tracker"));
        }
        let Some(device) = self.device.clone() else {
            return Err(InputError::Unavailable("eye tracker"));
        };

        let worker = StreamWorker::spawn("gaze-stream", move |stop| {
            let mut errors = 0u32;
            let mut count = 0u64;
            while !stop.load(Ordering::SeqCst) {
                let polled = match device.lock() {
                    Ok(mut d) => d.poll(POLL_TIMEOUT),
                    Err(_) => {
                        sender.report_lost("eye tracker binding poisoned");
                        break;
                    }
                };
                match polled {
                    Ok(Some(raw)) => {
                        errors = 0;
                        count += 1;
                        if !sender.push(GazeSample::from_eyes(raw.t, raw.left, raw.right)) {
                            break;
                        }
                    }
                    Ok(None) => errors = 0,
                    Err(e) => {
                        errors += 1;
                        warn!("gaze read failed: {e}");
                        if errors >= MAX_CONSECUTIVE_ERRORS {
                            sender.report_lost(format!("eye tracker stopped responding: {e}"));
                            break;
                        }
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }
            }
            info!("gaze stream worker stopped after {count} samples");
        })
        .map_err(|e| InputError::StreamStart(e.to_string()))?;

        self.worker = Some(worker);
        info!("gaze tracking started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), InputError> {
        if let Some(worker) = self.worker.take() {
            if !worker.stop(STOP_TIMEOUT) {
                warn!("gaze stream did not shut down cleanly");
            }
            info!("gaze tracking stopped");
        }
        Ok(())
    }
}

impl Drop for EyeTrackerSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
