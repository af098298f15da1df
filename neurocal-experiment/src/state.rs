use crate::buffer::{PhaseBuffers, RouteOutcome};
use crate::config::TimingSettings;
use crate::dwell::{DWELL_RADIUS_PX, DwellTracker, ramp_progress};
use crate::sequence::{block_at, closes_block, repetition_at};
use crate::SessionError;
use log::{debug, info};
use neurocal_core::{
    CollectionPhase, InputMode, Sample, SampleShape, SealedTrial, StimulusLayout,
    TargetIndex, TrialMeta, TrialState, wall_clock_secs,
};
use neurocal_timing::Timer;

/// Notifications produced by [`TrialStateMachine::tick`] and friends.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    /// A starting rest began. EEG sessions carry the motor-imagery cue on the
    /// first repetition of each target.
    RestShown {
        target: TargetIndex,
        instruction: Option<&'static str>,
    },
    StimulusActivated(TargetIndex),
    StimulusDeactivated(TargetIndex),
    TrialSealed(SealedTrial),
    BlockComplete(u32),
    SessionComplete,
}

/// Rest → focus → rest cycle over a calibration sequence.
///
/// Phase timing is wall-clock time since phase entry, re-read on every tick.
/// The machine owns the phase buffers; samples reach them through
/// [`route`](Self::route) on the same thread that calls `tick`.
pub struct TrialStateMachine<T: Timer> {
    pub timer: T,
    mode: InputMode,
    state: TrialState,
    sequence: Vec<TargetIndex>,
    index: usize,
    completed: usize,
    phase_started_ns: u64,
    /// Duration of the phase in progress, fixed when the phase was entered.
    phase_duration: f64,
    timing: TimingSettings,
    paused_at_ns: Option<u64>,
    buffers: PhaseBuffers,
    dwell: DwellTracker,
    layout: StimulusLayout,
}

impl<T: Timer> TrialStateMachine<T> {
    pub fn new(mode: InputMode, shape: SampleShape, timing: TimingSettings, timer: T) -> Self {
        Self {
            timer,
            mode,
            state: TrialState::Idle,
            sequence: Vec::new(),
            index: 0,
            completed: 0,
            phase_started_ns: 0,
            phase_duration: 0.0,
            timing,
            paused_at_ns: None,
            buffers: PhaseBuffers::new(shape),
            dwell: DwellTracker::new(),
            layout: StimulusLayout::default(),
        }
    }

    /// Switches the recording mode. Refused while a session is running.
    pub fn configure(&mut self, mode: InputMode, shape: SampleShape) -> Result<(), SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        self.mode = mode;
        self.buffers.set_shape(shape);
        Ok(())
    }

    pub fn start(&mut self, sequence: Vec<TargetIndex>) -> Result<Vec<TrialEvent>, SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        if sequence.is_empty() {
            return Err(SessionError::EmptySequence);
        }
        info!(
            "{} calibration started: {} trials",
            self.mode,
            sequence.len()
        );
        debug!(
            "sequence: {:?}",
            sequence.iter().map(|t| t.get()).collect::<Vec<_>>()
        );
        self.sequence = sequence;
        self.index = 0;
        self.completed = 0;
        self.paused_at_ns = None;
        self.buffers.discard();

        let mut events = Vec::new();
        self.enter_starting_rest(&mut events);
        Ok(events)
    }

    pub fn tick(&mut self) -> Vec<TrialEvent> {
        let mut events = Vec::new();
        if self.paused_at_ns.is_some() {
            return events;
        }
        let elapsed = self.phase_elapsed();
        match self.state {
            TrialState::StartingRest if elapsed >= self.phase_duration => {
                let target = self.sequence[self.index];
                self.enter(TrialState::Focus, self.timing.focus_time);
                self.dwell.reset();
                debug!(
                    "showing circle {target} (trial {}/{})",
                    self.index + 1,
                    self.sequence.len()
                );
                events.push(TrialEvent::StimulusActivated(target));
            }
            TrialState::Focus if elapsed >= self.phase_duration => {
                let target = self.sequence[self.index];
                self.enter(TrialState::EndingRest, self.timing.gap_time);
                self.dwell.reset();
                events.push(TrialEvent::StimulusDeactivated(target));
            }
            TrialState::EndingRest if elapsed >= self.phase_duration => {
                self.seal(&mut events);
                if self.index + 1 < self.sequence.len() {
                    self.index += 1;
                    self.enter_starting_rest(&mut events);
                } else {
                    self.state = TrialState::Complete;
                    self.buffers.set_phase(None);
                    info!("calibration complete: {} trials", self.completed);
                    events.push(TrialEvent::SessionComplete);
                }
            }
            _ => {}
        }
        events
    }

    /// Feeds one sample to the open trial. Dropped while idle, paused or on a
    /// shape mismatch.
    pub fn route(&mut self, sample: Sample) -> RouteOutcome {
        if self.paused_at_ns.is_some() || !self.state.is_active() {
            return RouteOutcome::Inactive;
        }
        let focus_target = (self.state == TrialState::Focus).then(|| self.sequence[self.index]);
        let gaze_point = match (&sample, focus_target) {
            (Sample::Gaze(g), Some(_)) if self.mode == InputMode::EyeTracker => Some(g.point()),
            _ => None,
        };
        let outcome = self.buffers.route(sample);
        if let (RouteOutcome::Stored(_), Some(point), Some(target)) =
            (outcome, gaze_point, focus_target)
        {
            let on_target = point.is_some_and(|(nx, ny)| {
                let (x, y) = self.layout.to_pixels(nx, ny);
                self.layout.is_within(target, x, y, DWELL_RADIUS_PX)
            });
            self.dwell.observe(on_target, self.timer.now_ns());
        }
        outcome
    }

    /// Abandons the open trial. Its samples are discarded, never sealed.
    pub fn stop(&mut self) -> Vec<TrialEvent> {
        let mut events = Vec::new();
        if !self.state.is_active() {
            return events;
        }
        if self.state == TrialState::Focus {
            events.push(TrialEvent::StimulusDeactivated(self.sequence[self.index]));
        }
        let discarded = self.buffers.counts().iter().sum::<usize>();
        self.buffers.discard();
        self.buffers.set_phase(None);
        self.dwell.reset();
        self.paused_at_ns = None;
        self.state = TrialState::Idle;
        info!(
            "calibration stopped at trial {}/{}, {discarded} samples discarded",
            self.index + 1,
            self.sequence.len()
        );
        events
    }

    /// Returns a finished session to `Idle`.
    pub fn reset(&mut self) {
        if self.state == TrialState::Complete {
            self.state = TrialState::Idle;
        }
    }

    pub fn pause(&mut self) -> bool {
        if !self.state.is_active() || self.paused_at_ns.is_some() {
            return false;
        }
        self.paused_at_ns = Some(self.timer.now_ns());
        self.dwell.reset();
        true
    }

    /// Continues the phase in progress; the paused span does not count toward it.
    pub fn resume(&mut self) -> bool {
        let Some(paused_at) = self.paused_at_ns.take() else {
            return false;
        };
        let paused_for = self.timer.now_ns().saturating_sub(paused_at);
        self.phase_started_ns += paused_for;
        debug!("resumed after {:.3} s", paused_for as f64 / 1e9);
        true
    }

    /// Takes effect from the next rest phase entered.
    pub fn set_gap_time(&mut self, secs: f64) {
        self.timing.gap_time = secs;
    }

    /// Takes effect from the next focus phase entered.
    pub fn set_focus_time(&mut self, secs: f64) {
        self.timing.focus_time = secs;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.layout.resize(width, height);
    }

    /// Cosmetic progress toward the lit target in `[0, 1]`; zero outside focus.
    pub fn focus_progress(&self) -> f64 {
        if self.state != TrialState::Focus {
            return 0.0;
        }
        match self.mode {
            InputMode::EyeTracker => self
                .dwell
                .progress(self.now_or_paused(), self.phase_duration),
            _ => ramp_progress(self.phase_elapsed(), self.phase_duration),
        }
    }

    /// Seconds left in the phase in progress.
    pub fn phase_remaining(&self) -> f64 {
        if !self.state.is_active() {
            return 0.0;
        }
        (self.phase_duration - self.phase_elapsed()).max(0.0)
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at_ns.is_some()
    }

    pub fn current_target(&self) -> Option<TargetIndex> {
        self.state
            .is_active()
            .then(|| self.sequence[self.index])
    }

    /// Zero-based position of the open trial in the sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sequence(&self) -> &[TargetIndex] {
        &self.sequence
    }

    pub fn completed_trials(&self) -> usize {
        self.completed
    }

    pub fn calibration_block(&self) -> u32 {
        block_at(&self.sequence, self.index, self.mode)
    }

    /// Earlier consecutive visits of the current target; used by EEG status text.
    pub fn repetition(&self) -> usize {
        repetition_at(&self.sequence, self.index)
    }

    pub fn timing(&self) -> TimingSettings {
        self.timing
    }

    pub fn buffers(&self) -> &PhaseBuffers {
        &self.buffers
    }

    pub fn layout(&self) -> &StimulusLayout {
        &self.layout
    }

    fn enter(&mut self, state: TrialState, duration: f64) {
        self.state = state;
        self.phase_started_ns = self.timer.now_ns();
        self.phase_duration = duration;
        self.buffers.set_phase(state.collection_phase());
    }

    fn enter_starting_rest(&mut self, events: &mut Vec<TrialEvent>) {
        debug_assert!(self.buffers.is_empty());
        let target = self.sequence[self.index];
        self.enter(TrialState::StartingRest, self.timing.gap_time);
        let instruction = (self.mode.is_sequential() && self.repetition() == 0)
            .then(|| target.instruction());
        events.push(TrialEvent::RestShown {
            target,
            instruction,
        });
    }

    fn seal(&mut self, events: &mut Vec<TrialEvent>) {
        let target = self.sequence[self.index];
        let trial_block = self.calibration_block();
        let samples = self.buffers.snapshot_and_clear();
        self.buffers.set_phase(None);
        let trial = SealedTrial {
            target,
            calibration_index: trial_block,
            position: self.index,
            samples,
            meta: TrialMeta {
                gap_time: self.timing.gap_time,
                focus_time: self.timing.focus_time,
                timestamp: wall_clock_secs(),
            },
        };
        debug!(
            "sealed circle {target}: {} {} / {} {} / {} {}",
            CollectionPhase::StartingRest,
            trial.samples.starting_rest.len(),
            CollectionPhase::Focus,
            trial.samples.focus.len(),
            CollectionPhase::EndingRest,
            trial.samples.ending_rest.len()
        );
        self.completed += 1;
        events.push(TrialEvent::TrialSealed(trial));
        if closes_block(&self.sequence, self.index, self.mode) {
            events.push(TrialEvent::BlockComplete(trial_block));
        }
    }

    fn phase_elapsed(&self) -> f64 {
        self.now_or_paused().saturating_sub(self.phase_started_ns) as f64 / 1e9
    }

    fn now_or_paused(&self) -> u64 {
        self.paused_at_ns.unwrap_or_else(|| self.timer.now_ns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocal_core::{EegSample, GazeSample};
    use neurocal_timing::ManualTimer;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn targets(ns: &[u8]) -> Vec<TargetIndex> {
        ns.iter().map(|&n| TargetIndex::new(n).unwrap()).collect()
    }

    fn machine(mode: InputMode, shape: SampleShape) -> (TrialStateMachine<ManualTimer>, ManualTimer) {
        let clock = ManualTimer::new();
        let timing = TimingSettings {
            focus_time: 1.0,
            gap_time: 0.5,
        };
        (TrialStateMachine::new(mode, shape, timing, clock.clone()), clock)
    }

    fn pointer(t: f64) -> Sample {
        GazeSample::pointer(t, 10.0, 10.0).into()
    }

    #[test]
    fn empty_sequence_is_refused() {
        let (mut m, _) = machine(InputMode::Pointer, SampleShape::Gaze);
        assert!(matches!(m.start(Vec::new()), Err(SessionError::EmptySequence)));
        assert_eq!(m.state(), TrialState::Idle);
    }

    #[test]
    fn walks_rest_focus_rest() {
        let (mut m, clock) = machine(InputMode::Pointer, SampleShape::Gaze);
        let events = m.start(targets(&[3, 5])).unwrap();
        assert_eq!(
            events,
            [TrialEvent::RestShown {
                target: TargetIndex::new(3).unwrap(),
                instruction: None
            }]
        );
        assert_eq!(m.state(), TrialState::StartingRest);
        assert!(matches!(m.start(targets(&[1])), Err(SessionError::AlreadyRunning)));

        clock.advance(ms(400));
        assert!(m.tick().is_empty());
        clock.advance(ms(100));
        assert_eq!(
            m.tick(),
            [TrialEvent::StimulusActivated(TargetIndex::new(3).unwrap())]
        );
        assert_eq!(m.state(), TrialState::Focus);

        clock.advance(ms(1000));
        assert_eq!(
            m.tick(),
            [TrialEvent::StimulusDeactivated(TargetIndex::new(3).unwrap())]
        );

        clock.advance(ms(500));
        let events = m.tick();
        assert!(matches!(&events[0], TrialEvent::TrialSealed(t) if t.target.get() == 3));
        assert_eq!(m.state(), TrialState::StartingRest);
        assert_eq!(m.current_target(), TargetIndex::new(5));
    }

    #[test]
    fn last_trial_completes_session() {
        let (mut m, clock) = machine(InputMode::Pointer, SampleShape::Gaze);
        m.start(targets(&[1])).unwrap();
        let mut all = Vec::new();
        for _ in 0..3 {
            clock.advance(ms(1000));
            all.extend(m.tick());
        }
        assert!(matches!(all.last(), Some(TrialEvent::SessionComplete)));
        assert_eq!(m.state(), TrialState::Complete);
        assert_eq!(m.route(pointer(0.0)), RouteOutcome::Inactive);
        m.reset();
        assert_eq!(m.state(), TrialState::Idle);
    }

    #[test]
    fn samples_land_in_the_phase_they_arrived_in() {
        let (mut m, clock) = machine(InputMode::Pointer, SampleShape::Gaze);
        m.start(targets(&[2, 4])).unwrap();
        m.route(pointer(0.0));
        clock.advance(ms(500));
        m.tick();
        for t in 1..=3 {
            m.route(pointer(t as f64));
        }
        clock.advance(ms(1000));
        m.tick();
        m.route(pointer(9.0));
        m.route(pointer(9.5));
        clock.advance(ms(500));

        let events = m.tick();
        let TrialEvent::TrialSealed(trial) = &events[0] else {
            panic!("expected a sealed trial, got {events:?}");
        };
        assert_eq!(trial.samples.starting_rest.len(), 1);
        assert_eq!(trial.samples.focus.len(), 3);
        assert_eq!(trial.samples.ending_rest.len(), 2);
        assert_eq!(trial.calibration_index, 1);
        assert!(m.buffers().is_empty());
    }

    fn run_blocks(
        m: &mut TrialStateMachine<ManualTimer>,
        clock: &ManualTimer,
        sequence: Vec<TargetIndex>,
    ) -> (Vec<u32>, Vec<u32>) {
        m.start(sequence).unwrap();
        let mut blocks = Vec::new();
        let mut indices = Vec::new();
        while m.state() != TrialState::Complete {
            clock.advance(ms(1000));
            for event in m.tick() {
                match event {
                    TrialEvent::BlockComplete(b) => blocks.push(b),
                    TrialEvent::TrialSealed(t) => indices.push(t.calibration_index),
                    _ => {}
                }
            }
        }
        (blocks, indices)
    }

    #[test]
    fn randomized_block_completes_every_eight_trials() {
        let (mut m, clock) = machine(InputMode::Pointer, SampleShape::Gaze);
        let sequence: Vec<TargetIndex> = TargetIndex::all().chain(TargetIndex::all()).collect();
        let (blocks, indices) = run_blocks(&mut m, &clock, sequence);
        assert_eq!(blocks, [1, 2]);
        assert_eq!(&indices[..8], [1; 8]);
        assert_eq!(&indices[8..], [2; 8]);
    }

    #[test]
    fn eeg_block_completes_after_each_target_run() {
        let (mut m, clock) = machine(InputMode::Eeg, SampleShape::Eeg { channel_count: 1 });
        let sequence: Vec<TargetIndex> = (1..=8u8)
            .flat_map(|n| std::iter::repeat_n(TargetIndex::new(n).unwrap(), 2))
            .collect();
        let (blocks, indices) = run_blocks(&mut m, &clock, sequence);
        assert_eq!(blocks, [1, 2, 3, 4, 5, 6, 7, 8]);
        let expected: Vec<u32> = (1..=8u32).flat_map(|t| [t, t]).collect();
        assert_eq!(indices, expected);
    }

    #[test]
    fn eeg_cue_only_on_first_repetition() {
        let (mut m, clock) = machine(InputMode::Eeg, SampleShape::Eeg { channel_count: 1 });
        let events = m.start(targets(&[1, 1, 2])).unwrap();
        assert_eq!(
            events,
            [TrialEvent::RestShown {
                target: TargetIndex::new(1).unwrap(),
                instruction: Some("THINK MOVE FORWARD")
            }]
        );
        let mut cues = Vec::new();
        while m.state() != TrialState::Complete {
            clock.advance(ms(1000));
            for event in m.tick() {
                if let TrialEvent::RestShown { instruction, .. } = event {
                    cues.push(instruction);
                }
            }
        }
        assert_eq!(cues, [None, Some("THINK MOVE BACKWARD")]);
    }

    #[test]
    fn stop_mid_focus_discards_trial() {
        let (mut m, clock) = machine(InputMode::Pointer, SampleShape::Gaze);
        m.start(targets(&[6, 7])).unwrap();
        clock.advance(ms(500));
        m.tick();
        m.route(pointer(1.0));

        let events = m.stop();
        assert_eq!(
            events,
            [TrialEvent::StimulusDeactivated(TargetIndex::new(6).unwrap())]
        );
        assert_eq!(m.state(), TrialState::Idle);
        assert!(m.buffers().is_empty());
        assert_eq!(m.route(pointer(2.0)), RouteOutcome::Inactive);
        clock.advance(ms(10000));
        assert!(m.tick().is_empty());
    }

    #[test]
    fn pause_freezes_phase_timing() {
        let (mut m, clock) = machine(InputMode::Pointer, SampleShape::Gaze);
        m.start(targets(&[1])).unwrap();
        clock.advance(ms(300));
        assert!(m.pause());
        assert!(!m.pause());
        clock.advance(ms(5000));
        assert!(m.tick().is_empty());
        assert_eq!(m.route(pointer(0.0)), RouteOutcome::Inactive);
        assert!((m.phase_remaining() - 0.2).abs() < 1e-9);

        assert!(m.resume());
        clock.advance(ms(100));
        assert!(m.tick().is_empty());
        clock.advance(ms(100));
        assert_eq!(m.tick().len(), 1);
        assert_eq!(m.state(), TrialState::Focus);
    }

    #[test]
    fn timing_changes_apply_to_next_phase_and_meta() {
        let (mut m, clock) = machine(InputMode::Pointer, SampleShape::Gaze);
        m.start(targets(&[1])).unwrap();
        m.set_gap_time(2.0);
        clock.advance(ms(500));
        m.tick();
        assert_eq!(m.state(), TrialState::Focus);

        m.set_focus_time(3.0);
        clock.advance(ms(1000));
        m.tick();
        assert_eq!(m.state(), TrialState::EndingRest);

        clock.advance(ms(1000));
        assert!(m.tick().is_empty());
        clock.advance(ms(1000));
        let events = m.tick();
        let TrialEvent::TrialSealed(trial) = &events[0] else {
            panic!("expected a sealed trial, got {events:?}");
        };
        assert_eq!(trial.meta.gap_time, 2.0);
        assert_eq!(trial.meta.focus_time, 3.0);
    }

    #[test]
    fn eeg_shape_mismatch_is_dropped() {
        let (mut m, _) = machine(InputMode::Eeg, SampleShape::Eeg { channel_count: 32 });
        m.start(targets(&[1])).unwrap();
        let short = Sample::Eeg(EegSample {
            t: 0.0,
            ch: vec![0.0; 31],
        });
        assert_eq!(m.route(short), RouteOutcome::ShapeMismatch);
        let full = Sample::Eeg(EegSample {
            t: 0.0,
            ch: vec![0.0; 32],
        });
        assert_eq!(
            m.route(full),
            RouteOutcome::Stored(CollectionPhase::StartingRest)
        );
    }

    #[test]
    fn eye_tracker_progress_follows_dwell() {
        let (mut m, clock) = machine(InputMode::EyeTracker, SampleShape::Gaze);
        m.set_focus_time(3.0);
        m.start(targets(&[1])).unwrap();
        clock.advance(ms(500));
        m.tick();

        let (tx, ty) = m.layout().position(TargetIndex::new(1).unwrap());
        let (w, h) = (m.layout().width, m.layout().height);
        let on_target = || Sample::from(GazeSample::from_eyes(0.0, Some([tx / w, ty / h]), Some([tx / w, ty / h])));

        m.route(on_target());
        clock.advance(ms(1000));
        m.route(on_target());
        assert_eq!(m.focus_progress(), 0.0);
        clock.advance(ms(1250));
        assert!((m.focus_progress() - 0.5).abs() < 1e-6);

        m.route(GazeSample::from_eyes(0.0, None, None).into());
        assert_eq!(m.focus_progress(), 0.0);
    }

    #[test]
    fn pointer_progress_ramps_near_end_of_focus() {
        let (mut m, clock) = machine(InputMode::Pointer, SampleShape::Gaze);
        m.start(targets(&[1])).unwrap();
        clock.advance(ms(500));
        m.tick();
        assert_eq!(m.focus_progress(), 0.0);
        clock.advance(ms(900));
        let p = m.focus_progress();
        assert!(p > 0.0 && p < 1.0, "{p}");
    }
}
