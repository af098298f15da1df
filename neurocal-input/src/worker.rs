use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long `stop` waits for a producer thread before abandoning it.
pub(crate) const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Background producer thread with a cooperative stop flag.
pub(crate) struct StreamWorker {
    name: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    done: Receiver<()>,
}

impl StreamWorker {
    pub(crate) fn spawn<F>(name: &str, body: F) -> std::io::Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = mpsc::channel();
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            body(flag);
            let _ = done_tx.send(());
        })?;
        debug!("{name} started");
        Ok(Self {
            name: name.to_string(),
            stop,
            handle: Some(handle),
            done,
        })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Signals the thread and waits up to `timeout`. Returns false if the thread
    /// had to be abandoned.
    pub(crate) fn stop(mut self, timeout: Duration) -> bool {
        self.stop.store(true, Ordering::SeqCst);
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        warn!("{} panicked", self.name);
                    }
                }
                debug!("{} stopped", self.name);
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "{} did not stop within {:?}, abandoning it",
                    self.name, timeout
                );
                false
            }
        }
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
