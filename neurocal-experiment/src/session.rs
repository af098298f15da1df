//! Session controller: the one place that owns the input source, the trial
//! state machine and the persistence sink, driven from a single tick thread.

use crate::config::{CalibrationConfig, check_focus_time, check_gap_time};
use crate::sequence;
use crate::state::{TrialEvent, TrialStateMachine};
use crate::{ConfigError, RouteOutcome, SessionError};
use log::{debug, error, info, warn};
use neurocal_core::{
    AppPhase, InputMode, SealedTrial, StatusLevel, TARGET_COUNT, TargetIndex, TrialRecord,
    TrialState,
};
use neurocal_input::{InputSource, SampleReceiver, sample_channel};
use neurocal_store::{EegFormat, GazeMapping, RunIdentity, TrialSink};
use neurocal_timing::Timer;
use rand::Rng;

/// Pointer within this many pixels of a target counts as hovering it.
pub const HOVER_RADIUS_PX: f64 = 40.0;

/// Presentation layer callbacks.
///
/// Only status, completion and hardware reports are required; the rest default
/// to no-ops for presenters that do not draw stimuli.
pub trait Presenter {
    fn status(&mut self, message: &str, level: StatusLevel);

    fn completion(&mut self);

    fn hardware_status(&mut self, connected: bool);

    fn rest_shown(&mut self, _target: TargetIndex, _instruction: Option<&str>) {}

    fn stimulus(&mut self, _target: TargetIndex, _active: bool) {}

    fn focus_progress(&mut self, _target: TargetIndex, _progress: f64) {}

    fn countdown(&mut self, _label: &str, _remaining_secs: f64) {}

    fn hover(&mut self, _target: Option<TargetIndex>) {}
}

/// Counters for the current or last session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub trials_saved: usize,
    pub trials_failed: usize,
    pub samples_routed: usize,
    pub samples_rejected: usize,
}

pub struct SessionController<T, S, P, R>
where
    T: Timer,
    S: TrialSink,
    P: Presenter,
    R: Rng,
{
    username: String,
    config: CalibrationConfig,
    app_phase: AppPhase,
    machine: TrialStateMachine<T>,
    source: InputSource,
    receiver: Option<SampleReceiver>,
    sink: S,
    presenter: P,
    rng: R,
    identity: Option<RunIdentity>,
    block_records: Vec<TrialRecord>,
    stats: SessionStats,
    hovered: Option<TargetIndex>,
}

impl<T, S, P, R> SessionController<T, S, P, R>
where
    T: Timer,
    S: TrialSink,
    P: Presenter,
    R: Rng,
{
    pub fn new(
        username: impl Into<String>,
        mut config: CalibrationConfig,
        source: InputSource,
        sink: S,
        presenter: P,
        timer: T,
        rng: R,
    ) -> Self {
        config.input_mode = source.mode();
        let machine =
            TrialStateMachine::new(source.mode(), source.shape(), config.timing(), timer);
        Self {
            username: username.into(),
            config,
            app_phase: AppPhase::default(),
            machine,
            source,
            receiver: None,
            sink,
            presenter,
            rng,
            identity: None,
            block_records: Vec::new(),
            stats: SessionStats::default(),
            hovered: None,
        }
    }

    pub fn set_app_phase(&mut self, phase: AppPhase) {
        self.stop();
        self.app_phase = phase;
        self.hovered = None;
        self.presenter
            .status(&format!("{} Active", phase.label()), StatusLevel::Info);
    }

    /// Replaces the input source. A running session is stopped first; switching
    /// to a different mode loads that mode's default timings.
    pub fn set_input_mode(&mut self, source: InputSource) {
        self.stop();
        if let Err(e) = self.source.stop() {
            warn!("error stopping previous input source: {e}");
        }
        let mode = source.mode();
        if mode != self.config.input_mode {
            let timing = CalibrationConfig::default_timing(mode);
            self.config.focus_time = timing.focus_time;
            self.config.gap_time = timing.gap_time;
            self.machine.set_focus_time(timing.focus_time);
            self.machine.set_gap_time(timing.gap_time);
        }
        self.config.input_mode = mode;
        self.source = source;
        if let Err(e) = self.machine.configure(mode, self.source.shape()) {
            warn!("input mode change not applied: {e}");
        }
        info!("input mode set to {mode}");
        self.report_hardware();
    }

    pub fn set_focus_time(&mut self, secs: f64) -> Result<(), ConfigError> {
        if let Err(e) = check_focus_time(secs) {
            self.presenter.status(&e.to_string(), StatusLevel::Error);
            return Err(e);
        }
        self.config.focus_time = secs;
        self.machine.set_focus_time(secs);
        Ok(())
    }

    pub fn set_gap_time(&mut self, secs: f64) -> Result<(), ConfigError> {
        if let Err(e) = check_gap_time(secs) {
            self.presenter.status(&e.to_string(), StatusLevel::Error);
            return Err(e);
        }
        self.config.gap_time = secs;
        self.machine.set_gap_time(secs);
        Ok(())
    }

    /// Applies to the next session started.
    pub fn set_rounds(&mut self, rounds: usize) -> Result<(), ConfigError> {
        if rounds == 0 {
            let e = ConfigError::NoRounds;
            self.presenter.status(&e.to_string(), StatusLevel::Error);
            return Err(e);
        }
        self.config.rounds = rounds;
        Ok(())
    }

    pub fn set_allow_without_hardware(&mut self, allow: bool) {
        self.config.allow_without_hardware = allow;
        if allow {
            self.presenter.status(
                "Hardware check disabled - Calibration allowed",
                StatusLevel::Warning,
            );
        } else {
            self.presenter
                .status("Hardware check enabled", StatusLevel::Info);
        }
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.machine.is_running() {
            return self.refuse(SessionError::AlreadyRunning);
        }
        if !self.app_phase.allows_calibration() {
            return self.refuse(SessionError::WrongPhase(self.app_phase));
        }
        if let Err(e) = self.config.validate() {
            return self.refuse(e.into());
        }
        let mode = self.source.mode();
        let available = self.source.is_available();
        if !available && !self.config.allow_without_hardware {
            return self.refuse(SessionError::HardwareUnavailable(mode));
        }

        let sequence = sequence::generate(self.config.rounds, mode, &mut self.rng);
        if sequence.is_empty() {
            return self.refuse(SessionError::EmptySequence);
        }

        let (sender, receiver) = sample_channel(self.config.channel_capacity);
        if available {
            if let Err(e) = self.source.start(sender) {
                if !self.config.allow_without_hardware {
                    return self.refuse(e.into());
                }
                warn!("continuing without input stream: {e}");
                self.presenter.status(
                    &format!("Input stream failed ({e}), continuing without data"),
                    StatusLevel::Warning,
                );
            }
        } else {
            warn!("{} not connected, recording without input", mode.label());
        }

        let format = EegFormat {
            channel_count: self
                .source
                .channel_count()
                .unwrap_or(self.config.eeg.channel_count),
            sampling_rate: self
                .source
                .sampling_rate()
                .unwrap_or(self.config.eeg.sampling_rate),
        };
        let first = sequence[0];
        let events = match self.machine.start(sequence) {
            Ok(events) => events,
            Err(e) => {
                self.halt_stream();
                return self.refuse(e);
            }
        };

        self.receiver = Some(receiver);
        let identity = RunIdentity::new(self.username.clone(), mode, Some(format));
        info!(
            "session {} for {} ({mode}, {} rounds)",
            identity.session_id, identity.username, self.config.rounds
        );
        self.identity = Some(identity);
        self.block_records.clear();
        self.stats = SessionStats::default();
        self.dispatch(events);

        let message = if mode.is_sequential() {
            format!(
                "EEG Calibration: Circle {first} (1/{})",
                self.config.rounds
            )
        } else {
            format!("Calibration Started: Round 1/{}", self.config.rounds)
        };
        self.presenter.status(&message, StatusLevel::Success);
        Ok(())
    }

    /// Abandons the running session. The open trial is not persisted.
    pub fn stop(&mut self) {
        if !self.machine.is_running() {
            return;
        }
        let events = self.machine.stop();
        self.dispatch(events);
        self.halt_stream();
        self.presenter
            .status("Calibration Stopped", StatusLevel::Warning);
    }

    pub fn pause(&mut self) -> bool {
        let paused = self.machine.pause();
        if paused {
            self.presenter
                .status("Calibration Paused", StatusLevel::Warning);
        }
        paused
    }

    pub fn resume(&mut self) -> bool {
        let resumed = self.machine.resume();
        if resumed {
            self.presenter
                .status("Calibration Resumed", StatusLevel::Info);
        }
        resumed
    }

    /// One scheduler step: drain the input channel, route, then advance phases.
    pub fn tick(&mut self) {
        if !self.machine.is_running() {
            return;
        }
        let lost = self.receiver.as_ref().and_then(|rx| rx.take_lost());
        if let Some(reason) = lost {
            error!("input source lost: {reason}");
            let events = self.machine.stop();
            self.dispatch(events);
            self.halt_stream();
            self.presenter
                .status(&format!("Input device lost: {reason}"), StatusLevel::Error);
            self.presenter.hardware_status(false);
            return;
        }

        let samples = self
            .receiver
            .as_ref()
            .map(|rx| rx.drain())
            .unwrap_or_default();
        for sample in samples {
            match self.machine.route(sample) {
                RouteOutcome::Stored(_) => self.stats.samples_routed += 1,
                RouteOutcome::ShapeMismatch => self.stats.samples_rejected += 1,
                RouteOutcome::Inactive => {}
            }
        }

        let events = self.machine.tick();
        self.dispatch(events);

        let label = match self.machine.state() {
            TrialState::Focus => "Focus",
            TrialState::StartingRest | TrialState::EndingRest => "Rest",
            TrialState::Idle | TrialState::Complete => return,
        };
        self.presenter
            .countdown(label, self.machine.phase_remaining());
        if let (TrialState::Focus, Some(target)) =
            (self.machine.state(), self.machine.current_target())
        {
            self.presenter
                .focus_progress(target, self.machine.focus_progress());
        }
    }

    pub fn on_mouse_move(&mut self, x: f64, y: f64) {
        self.source.on_pointer_move(x, y);
        if self.app_phase.tracks_hover() && self.source.mode() == InputMode::Pointer {
            let hovered = self.machine.layout().hit_target(x, y, HOVER_RADIUS_PX);
            if hovered != self.hovered {
                self.hovered = hovered;
                self.presenter.hover(hovered);
            }
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.machine.resize(width, height);
    }

    /// Stops any session and releases the input device.
    pub fn shutdown(&mut self) {
        self.stop();
        if let Err(e) = self.source.stop() {
            warn!("error stopping input source: {e}");
        }
    }

    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    pub fn state(&self) -> TrialState {
        self.machine.state()
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn app_phase(&self) -> AppPhase {
        self.app_phase
    }

    pub fn machine(&self) -> &TrialStateMachine<T> {
        &self.machine
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    pub fn identity(&self) -> Option<&RunIdentity> {
        self.identity.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    fn refuse(&mut self, err: SessionError) -> Result<(), SessionError> {
        let message = match &err {
            SessionError::HardwareUnavailable(_) => {
                format!("{err} - enable 'allow without hardware'")
            }
            SessionError::WrongPhase(_) => "Must switch to Calibration Phase".to_string(),
            _ => err.to_string(),
        };
        warn!("calibration start refused: {err}");
        self.presenter.status(&message, StatusLevel::Error);
        Err(err)
    }

    fn report_hardware(&mut self) {
        let mode = self.source.mode();
        if self.source.is_available() {
            let level = if mode.needs_hardware() {
                StatusLevel::Success
            } else {
                StatusLevel::Info
            };
            self.presenter
                .status(&format!("{} Active", mode.label()), level);
            self.presenter.hardware_status(true);
        } else {
            self.presenter.status(
                &format!(
                    "{} Not Connected - Enable 'Allow Without Hardware'",
                    mode.label()
                ),
                StatusLevel::Error,
            );
            self.presenter.hardware_status(false);
        }
    }

    fn dispatch(&mut self, events: Vec<TrialEvent>) {
        for event in events {
            match event {
                TrialEvent::RestShown {
                    target,
                    instruction,
                } => {
                    self.presenter.rest_shown(target, instruction);
                    if self.machine.index() > 0 {
                        self.progress_status(target);
                    }
                }
                TrialEvent::StimulusActivated(target) => self.presenter.stimulus(target, true),
                TrialEvent::StimulusDeactivated(target) => self.presenter.stimulus(target, false),
                TrialEvent::TrialSealed(trial) => self.persist(trial),
                TrialEvent::BlockComplete(block) => self.finish_block(block),
                TrialEvent::SessionComplete => self.complete(),
            }
        }
    }

    fn progress_status(&mut self, target: TargetIndex) {
        let rounds = self.machine.sequence().len() / TARGET_COUNT;
        let message = if self.machine.mode().is_sequential() {
            format!(
                "EEG Calibration: Circle {target} ({}/{rounds})",
                self.machine.repetition() + 1
            )
        } else {
            format!(
                "Calibration: Round {}/{rounds}",
                self.machine.calibration_block()
            )
        };
        self.presenter.status(&message, StatusLevel::Info);
    }

    fn persist(&mut self, trial: SealedTrial) {
        let Some(identity) = &self.identity else {
            error!("sealed trial without a session identity, dropping it");
            return;
        };
        let record = identity.record(trial);
        if self.sink.append_trial(identity, &record) {
            self.stats.trials_saved += 1;
            if identity.mode.records_gaze() {
                self.block_records.push(record);
            }
        } else {
            self.stats.trials_failed += 1;
            self.presenter.status(
                &format!("Failed to save circle {} data", record.circle),
                StatusLevel::Error,
            );
        }
    }

    fn finish_block(&mut self, block: u32) {
        debug!("calibration block {block} complete");
        let Some(identity) = &self.identity else {
            return;
        };
        if !identity.mode.records_gaze() || self.block_records.is_empty() {
            return;
        }
        let mapping = GazeMapping::from_records(&self.block_records);
        self.block_records.clear();
        if !self.sink.write_mapping(identity, block, &mapping) {
            self.presenter.status(
                &format!("Failed to save mapping for block {block}"),
                StatusLevel::Warning,
            );
        }
    }

    fn complete(&mut self) {
        self.halt_stream();
        info!(
            "session finished: {} trials saved, {} failed, {} samples routed, {} rejected",
            self.stats.trials_saved,
            self.stats.trials_failed,
            self.stats.samples_routed,
            self.stats.samples_rejected
        );
        self.presenter
            .status("Calibration Complete", StatusLevel::Success);
        self.presenter.completion();
    }

    /// Stops the producer, then empties the channel so nothing queued is routed.
    fn halt_stream(&mut self) {
        if let Err(e) = self.source.stop() {
            warn!("error stopping input stream: {e}");
        }
        if let Some(receiver) = self.receiver.take() {
            let leftover = receiver.drain().len();
            if leftover > 0 {
                debug!("discarded {leftover} queued samples");
            }
            if receiver.dropped() > 0 {
                warn!(
                    "{} samples were dropped on a full channel this session",
                    receiver.dropped()
                );
            }
        }
        self.block_records.clear();
    }
}
