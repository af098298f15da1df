use log::warn;
use neurocal_core::Sample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};

/// Default number of samples the channel holds between two drains.
pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Default)]
struct LinkState {
    dropped: AtomicU64,
    lost: Mutex<Option<String>>,
}

/// Producer half handed to an adapter on `start`.
#[derive(Debug, Clone)]
pub struct SampleSender {
    tx: SyncSender<Sample>,
    link: Arc<LinkState>,
}

/// Consumer half, owned by the session controller and drained on the tick thread.
#[derive(Debug)]
pub struct SampleReceiver {
    rx: Receiver<Sample>,
    link: Arc<LinkState>,
}

pub fn sample_channel(capacity: usize) -> (SampleSender, SampleReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let link = Arc::new(LinkState::default());
    (
        SampleSender {
            tx,
            link: Arc::clone(&link),
        },
        SampleReceiver { rx, link },
    )
}

impl SampleSender {
    /// Never blocks. Returns false once the receiver is gone; a full channel
    /// drops the sample and counts it.
    pub fn push(&self, sample: impl Into<Sample>) -> bool {
        match self.tx.try_send(sample.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let n = self.link.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if n.is_power_of_two() {
                    warn!("sample channel full, {n} samples dropped so far");
                }
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Records that the device went away. Only the first reason is kept.
    pub fn report_lost(&self, reason: impl Into<String>) {
        if let Ok(mut slot) = self.link.lost.lock() {
            if slot.is_none() {
                *slot = Some(reason.into());
            }
        }
    }
}

impl SampleReceiver {
    /// Everything queued so far, in arrival order.
    pub fn drain(&self) -> Vec<Sample> {
        self.rx.try_iter().collect()
    }

    pub fn take_lost(&self) -> Option<String> {
        self.link.lost.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn dropped(&self) -> u64 {
        self.link.dropped.load(Ordering::Relaxed)
    }
}
