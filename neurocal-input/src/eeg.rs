use crate::worker::{STOP_TIMEOUT, StreamWorker};
use crate::{DeviceError, EegDevice, InputError, SampleSender};
use log::{debug, error, info, warn};
use neurocal_core::{EegSample, wall_clock_secs};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

const MAX_CONSECUTIVE_ERRORS: u32 = 10;

type SharedDevice = Arc<Mutex<Box<dyn EegDevice>>>;

/// EEG headset input. Acquisition runs on a producer thread at the device's
/// fixed sampling rate; samples are forwarded untouched.
pub struct EegSource {
    device: Option<SharedDevice>,
    worker: Option<StreamWorker>,
    channel_count: usize,
    sampling_rate: u32,
}

impl EegSource {
    /// Wraps a device and tries to connect to it. A failed connection leaves the
    /// source unavailable rather than failing construction.
    pub fn connect(mut device: Box<dyn EegDevice>) -> Self {
        info!("connecting to {}", device.model());
        if let Err(e) = device.connect() {
            error!("{} connection failed: {e}", device.model());
        }
        let channel_count = device.channel_count();
        let sampling_rate = device.sampling_rate();
        if device.is_connected() {
            info!(
                "{} connected: {channel_count} channels @ {sampling_rate} Hz",
                device.model()
            );
        }
        Self {
            device: Some(Arc::new(Mutex::new(device))),
            worker: None,
            channel_count,
            sampling_rate,
        }
    }

    /// No amplifier present; reports the configured format so a session can
    /// still run with explicit operator override.
    pub fn missing(channel_count: usize, sampling_rate: u32) -> Self {
        Self {
            device: None,
            worker: None,
            channel_count,
            sampling_rate,
        }
    }

    /// Never blocks: a binding held by the running stream counts as connected,
    /// one held by an abandoned stream as unavailable.
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

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    pub fn start(&mut self, sender: SampleSender) -> Result<(), InputError> {
        if self.worker.is_some() {
            warn!("EEG stream already running");
            return Err(InputError::AlreadyStreaming);
        }
        if !self.is_available() {
            error!("cannot start stream: EEG device not connected");
            return Err(InputError::Unavailable("EEG"));
        }
        let Some(device) = self.device.clone() else {
            return Err(InputError::Unavailable("EEG"));
        };

        device
            .try_lock()
            .map_err(|e| InputError::StreamStart(format!("device binding unavailable: {e}")))?
            .start_acquisition()
            .map_err(|e| InputError::StreamStart(e.to_string()))?;

        let worker = StreamWorker::spawn("eeg-stream", move |stop| {
            let mut errors = 0u32;
            let mut count = 0u64;
            'stream: while !stop.load(Ordering::SeqCst) {
                let batch = match device.lock() {
                    Ok(mut d) => d.read_scans(),
                    Err(_) => Err(DeviceError::Read("device binding poisoned".into())),
                };
                match batch {
                    Ok(scans) if scans.is_empty() => {
                        errors = 0;
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    Ok(scans) => {
                        errors = 0;
                        for ch in scans {
                            if stop.load(Ordering::SeqCst) {
                                break 'stream;
                            }
                            if !sender.push(EegSample {
                                t: wall_clock_secs(),
                                ch,
                            }) {
                                break 'stream;
                            }
                            count += 1;
                        }
                    }
                    Err(e) => {
                        errors += 1;
                        error!("EEG read failed: {e}");
                        if errors >= MAX_CONSECUTIVE_ERRORS {
                            error!("too many read errors, stopping stream");
                            sender.report_lost(format!("EEG device stopped responding: {e}"));
                            break;
                        }
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }
            }
            info!("EEG stream worker stopped after {count} samples");
        });

        match worker {
            Ok(worker) => {
                self.worker = Some(worker);
                info!("EEG streaming started");
                Ok(())
            }
            Err(e) => {
                self.stop_acquisition();
                Err(InputError::StreamStart(e.to_string()))
            }
        }
    }

    pub fn stop(&mut self) -> Result<(), InputError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        if !worker.stop(STOP_TIMEOUT) {
            warn!("EEG stream did not shut down cleanly, acquisition left running");
            return Err(InputError::StreamStop(format!(
                "stream worker still busy after {STOP_TIMEOUT:?}"
            )));
        }
        match self.stop_acquisition() {
            Some(e) => Err(InputError::StreamStop(e.to_string())),
            None => {
                info!("EEG streaming stopped");
                Ok(())
            }
        }
    }

    fn stop_acquisition(&self) -> Option<DeviceError> {
        let device = self.device.as_ref()?;
        let mut device = match device.try_lock() {
            Ok(d) => d,
            Err(e) => {
                return Some(DeviceError::Command(format!(
                    "device binding unavailable: {e}"
                )));
            }
        };
        match device.stop_acquisition() {
            Ok(()) => {
                debug!("stopped acquisition on {}", device.model());
                None
            }
            Err(e) => {
                warn!("error stopping acquisition: {e}");
                Some(e)
            }
        }
    }

    pub fn disconnect(&mut self) {
        let _ = self.stop();
        if let Some(device) = &self.device {
            match device.try_lock() {
                Ok(mut d) => d.disconnect(),
                Err(e) => warn!("EEG device not released: {e}"),
            }
        }
    }
}

impl Drop for EegSource {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_channel;
    use std::sync::atomic::AtomicUsize;

    /// Emits one scan per read until `fail_after` reads, then errors forever.
    struct FlakyAmp {
        connected: bool,
        reads: usize,
        fail_after: usize,
        stops: Arc<AtomicUsize>,
    }

    impl FlakyAmp {
        fn new(fail_after: usize, stops: Arc<AtomicUsize>) -> Self {
            Self {
                connected: false,
                reads: 0,
                fail_after,
                stops,
            }
        }
    }

    impl EegDevice for FlakyAmp {
        fn model(&self) -> &str {
            "flaky"
        }

        fn connect(&mut self) -> Result<(), DeviceError> {
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) {
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn sampling_rate(&self) -> u32 {
            250
        }

        fn channel_count(&self) -> usize {
            4
        }

        fn start_acquisition(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn read_scans(&mut self) -> Result<Vec<Vec<f64>>, DeviceError> {
            self.reads += 1;
            if self.reads > self.fail_after {
                Err(DeviceError::Read("cable unplugged".into()))
            } else {
                Ok(vec![vec![self.reads as f64; 4]])
            }
        }

        fn stop_acquisition(&mut self) -> Result<(), DeviceError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn reports_device_format() {
        let source = EegSource::connect(Box::new(FlakyAmp::new(0, Arc::default())));
        assert!(source.is_available());
        assert_eq!(source.channel_count(), 4);
        assert_eq!(source.sampling_rate(), 250);
    }

    #[test]
    fn missing_device_refuses_start() {
        let mut source = EegSource::missing(32, 256);
        let (tx, _rx) = sample_channel(4);
        assert!(matches!(source.start(tx), Err(InputError::Unavailable(_))));
        assert_eq!(source.channel_count(), 32);
    }

    #[test]
    fn read_errors_end_stream_with_lost_link() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut source = EegSource::connect(Box::new(FlakyAmp::new(3, Arc::clone(&stops))));
        let (tx, rx) = sample_channel(64);
        source.start(tx).unwrap();

        let mut lost = None;
        for _ in 0..400 {
            lost = rx.take_lost();
            if lost.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(lost.unwrap().contains("cable unplugged"));

        let samples = rx.drain();
        assert_eq!(samples.len(), 3);
        source.stop().unwrap();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!source.is_streaming());
    }

    /// Every read hangs far past the stop timeout.
    struct StalledAmp {
        stall: Duration,
        stops: Arc<AtomicUsize>,
    }

    impl EegDevice for StalledAmp {
        fn model(&self) -> &str {
            "stalled"
        }

        fn connect(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn disconnect(&mut self) {}

        fn is_connected(&self) -> bool {
            true
        }

        fn sampling_rate(&self) -> u32 {
            250
        }

        fn channel_count(&self) -> usize {
            4
        }

        fn start_acquisition(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn read_scans(&mut self) -> Result<Vec<Vec<f64>>, DeviceError> {
            std::thread::sleep(self.stall);
            Ok(Vec::new())
        }

        fn stop_acquisition(&mut self) -> Result<(), DeviceError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn stalled_read_does_not_block_stop() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut source = EegSource::connect(Box::new(StalledAmp {
            stall: Duration::from_secs(6),
            stops: Arc::clone(&stops),
        }));
        let (tx, _rx) = sample_channel(16);
        source.start(tx).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let began = std::time::Instant::now();
        let result = source.stop();
        let took = began.elapsed();
        assert!(matches!(result, Err(InputError::StreamStop(_))));
        assert!(took < STOP_TIMEOUT + Duration::from_millis(500), "stop took {took:?}");
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        assert!(!source.is_streaming());

        let began = std::time::Instant::now();
        assert!(!source.is_available());
        let (tx, _rx) = sample_channel(16);
        assert!(matches!(source.start(tx), Err(InputError::Unavailable(_))));
        drop(source);
        assert!(began.elapsed() < Duration::from_millis(200));
    }
}
