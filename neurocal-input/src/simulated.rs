//! Synthetic devices for development without hardware.

use crate::{DeviceError, EegDevice, GazeDevice, RawGaze};
use log::info;
use neurocal_core::wall_clock_secs;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::time::{Duration, Instant};

/// Alpha-band sine plus noise on every channel, paced by wall-clock time.
pub struct SimulatedEegDevice {
    channel_count: usize,
    sampling_rate: u32,
    connected: bool,
    acquiring_since: Option<Instant>,
    emitted: u64,
    baseline_amps: Vec<f64>,
    frequencies: Vec<f64>,
    rng: StdRng,
}

impl SimulatedEegDevice {
    pub fn new(channel_count: usize, sampling_rate: u32) -> Self {
        Self::with_rng(channel_count, sampling_rate, StdRng::from_os_rng())
    }

    pub fn seeded(channel_count: usize, sampling_rate: u32, seed: u64) -> Self {
        Self::with_rng(channel_count, sampling_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(channel_count: usize, sampling_rate: u32, mut rng: StdRng) -> Self {
        let baseline_amps = (0..channel_count)
            .map(|_| rng.random_range(10.0..50.0))
            .collect();
        let frequencies = (0..channel_count)
            .map(|_| rng.random_range(8.0..12.0))
            .collect();
        Self {
            channel_count,
            sampling_rate,
            connected: false,
            acquiring_since: None,
            emitted: 0,
            baseline_amps,
            frequencies,
            rng,
        }
    }

    fn scan(&mut self, t: f64) -> Vec<f64> {
        (0..self.channel_count)
            .map(|i| {
                let alpha = self.baseline_amps[i]
                    * self.rng.random_range(0.8..1.2)
                    * (0.5 + 0.5 * (2.0 * PI * self.frequencies[i] * t).sin());
                let noise = self.rng.random_range(-5.0..5.0);
                ((alpha + noise) * 100.0).round() / 100.0
            })
            .collect()
    }
}

impl EegDevice for SimulatedEegDevice {
    fn model(&self) -> &str {
        "simulated EEG"
    }

    fn connect(&mut self) -> Result<(), DeviceError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.acquiring_since = None;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn start_acquisition(&mut self) -> Result<(), DeviceError> {
        if !self.connected {
            return Err(DeviceError::NotConnected);
        }
        self.acquiring_since = Some(Instant::now());
        self.emitted = 0;
        info!(
            "simulated acquisition started ({} ch @ {} Hz)",
            self.channel_count, self.sampling_rate
        );
        Ok(())
    }

    fn read_scans(&mut self) -> Result<Vec<Vec<f64>>, DeviceError> {
        let Some(since) = self.acquiring_since else {
            return Err(DeviceError::NotConnected);
        };
        let due = (since.elapsed().as_secs_f64() * self.sampling_rate as f64) as u64;
        let pending = due.saturating_sub(self.emitted);
        let now = wall_clock_secs();
        let scans = (0..pending).map(|_| self.scan(now)).collect();
        self.emitted = due;
        Ok(scans)
    }

    fn stop_acquisition(&mut self) -> Result<(), DeviceError> {
        self.acquiring_since = None;
        Ok(())
    }
}

/// Gaze that drifts around the display, with occasional blinks where both eyes drop out.
pub struct SimulatedGazeDevice {
    rate_hz: f64,
    position: [f64; 2],
    next_at: Instant,
    rng: StdRng,
}

impl SimulatedGazeDevice {
    pub fn new(rate_hz: f64) -> Self {
        Self::with_rng(rate_hz, StdRng::from_os_rng())
    }

    pub fn seeded(rate_hz: f64, seed: u64) -> Self {
        Self::with_rng(rate_hz, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rate_hz: f64, rng: StdRng) -> Self {
        Self {
            rate_hz: rate_hz.max(1.0),
            position: [0.5, 0.5],
            next_at: Instant::now(),
            rng,
        }
    }
}

impl GazeDevice for SimulatedGazeDevice {
    fn model(&self) -> &str {
        "simulated eye tracker"
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<RawGaze>, DeviceError> {
        let now = Instant::now();
        if self.next_at > now {
            let wait = self.next_at - now;
            if wait > timeout {
                std::thread::sleep(timeout);
                return Ok(None);
            }
            std::thread::sleep(wait);
        }
        self.next_at += Duration::from_secs_f64(1.0 / self.rate_hz);

        for axis in &mut self.position {
            *axis = (*axis + self.rng.random_range(-0.01..0.01)).clamp(0.0, 1.0);
        }
        let t = wall_clock_secs();
        if self.rng.random_bool(0.02) {
            return Ok(Some(RawGaze {
                t,
                left: None,
                right: None,
            }));
        }
        let [x, y] = self.position;
        let jitter = self.rng.random_range(-0.005..0.005);
        Ok(Some(RawGaze {
            t,
            left: Some([x - 0.01 + jitter, y]),
            right: Some([x + 0.01 - jitter, y]),
        }))
    }
}
