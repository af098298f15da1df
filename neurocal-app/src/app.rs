use crate::config::AppConfig;
use crate::presenter::ConsolePresenter;
use anyhow::Result;
use log::{info, warn};
use neurocal_core::{AppPhase, InputMode, TrialState};
use neurocal_experiment::SessionController;
use neurocal_input::InputSource;
use neurocal_store::{DataLayout, JsonlWriter};
use neurocal_timing::{HighPrecisionTimer, TickRecorder, Timer};
use rand::rngs::ThreadRng;
use std::time::Duration;

type Controller = SessionController<HighPrecisionTimer, JsonlWriter, ConsolePresenter, ThreadRng>;

/// Headless recorder: one calibration session on simulated devices, driven by
/// a fixed-rate tick loop.
pub struct App {
    controller: Controller,
    timer: HighPrecisionTimer,
    ticks: TickRecorder,
    tick_ns: u64,
    max_seconds: Option<f64>,
    width: f64,
    height: f64,
}

impl App {
    pub fn new(config: AppConfig, username: String, max_seconds: Option<f64>) -> Result<Self> {
        let calibration = config.calibration.clone();
        calibration.validate()?;

        let timer = HighPrecisionTimer::new();
        let source = InputSource::simulated(
            calibration.input_mode,
            calibration.eeg.channel_count,
            calibration.eeg.sampling_rate,
        );
        let writer = JsonlWriter::new(DataLayout::new(&config.data_dir));
        info!("writing to {}", writer.layout().root().display());

        let allow = calibration.allow_without_hardware;
        let mut controller = SessionController::new(
            username,
            calibration,
            source,
            writer,
            ConsolePresenter::default(),
            timer.clone(),
            rand::rng(),
        );
        controller.resize(config.width, config.height);
        controller.set_allow_without_hardware(allow);
        controller.set_app_phase(AppPhase::Calibration);

        Ok(Self {
            controller,
            timer,
            ticks: TickRecorder::default(),
            tick_ns: config.tick_interval_ns(),
            max_seconds,
            width: config.width,
            height: config.height,
        })
    }

    pub fn run(mut self) -> Result<()> {
        info!("=== NEUROCAL CALIBRATION RECORDER ===");
        info!(
            "platform: {} / {}",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        let config = self.controller.config();
        info!(
            "mode {}, {} rounds, focus {:.1}s, gap {:.1}s",
            config.input_mode, config.rounds, config.focus_time, config.gap_time
        );

        self.controller.start()?;

        let started = self.timer.now_ns();
        let mut deadline = started;
        let mut last_tick = started;
        loop {
            let now = self.timer.now_ns();
            self.ticks.record(Duration::from_nanos(now - last_tick));
            last_tick = now;

            if self.controller.config().input_mode == InputMode::Pointer {
                let (x, y) = self.pointer_position(now);
                self.controller.on_mouse_move(x, y);
            }
            self.controller.tick();

            if self.controller.presenter().completed || !self.controller.is_running() {
                break;
            }
            if let Some(limit) = self.max_seconds {
                if self.timer.elapsed(started).as_secs_f64() >= limit {
                    warn!("time limit of {limit:.1}s reached");
                    self.controller.stop();
                    break;
                }
            }

            deadline += self.tick_ns;
            self.timer.sleep_until(deadline);
        }

        self.controller.shutdown();
        self.report();
        Ok(())
    }

    /// Synthetic cursor: drifts to the lit target during focus, rests at the
    /// center otherwise.
    fn pointer_position(&self, now_ns: u64) -> (f64, f64) {
        let machine = self.controller.machine();
        let layout = machine.layout();
        let (cx, cy) = match (machine.state(), machine.current_target()) {
            (TrialState::Focus, Some(target)) => layout.position(target),
            _ => layout.center,
        };
        let phase = now_ns as f64 / 1e9 * std::f64::consts::TAU;
        let wobble = self.width.min(self.height) * 0.01;
        (cx + wobble * phase.cos(), cy + wobble * phase.sin())
    }

    fn report(&self) {
        let stats = self.controller.stats();
        info!(
            "trials saved {}, failed {}; samples routed {}, rejected {}",
            stats.trials_saved, stats.trials_failed, stats.samples_routed, stats.samples_rejected
        );
        if let Some(identity) = self.controller.identity() {
            info!("session id {}", identity.session_id);
        }
        let tick = self.ticks.stats();
        info!(
            "tick loop: {:.3} ms/tick, {:.1} Hz, jitter {:.3} ms",
            tick.average_tick_ns / 1e6,
            tick.effective_hz,
            tick.jitter_ns / 1e6,
        );
    }
}
