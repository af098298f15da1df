use log::{debug, error, info, warn};
use neurocal_core::{StatusLevel, TargetIndex};
use neurocal_experiment::Presenter;

/// Presenter for headless runs: everything goes to the log.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    pub completed: bool,
    last_second: Option<u64>,
}

impl Presenter for ConsolePresenter {
    fn status(&mut self, message: &str, level: StatusLevel) {
        match level {
            StatusLevel::Info | StatusLevel::Success => info!("[{}] {message}", level.as_str()),
            StatusLevel::Warning => warn!("{message}"),
            StatusLevel::Error => error!("{message}"),
        }
    }

    fn completion(&mut self) {
        self.completed = true;
    }

    fn hardware_status(&mut self, connected: bool) {
        if connected {
            info!("hardware connected");
        } else {
            warn!("hardware not connected");
        }
    }

    fn rest_shown(&mut self, target: TargetIndex, instruction: Option<&str>) {
        match instruction {
            Some(cue) => info!("rest before circle {target}: {cue}"),
            None => debug!("rest before circle {target}"),
        }
    }

    fn stimulus(&mut self, target: TargetIndex, active: bool) {
        debug!("circle {target} {}", if active { "on" } else { "off" });
    }

    fn countdown(&mut self, label: &str, remaining_secs: f64) {
        let second = remaining_secs.ceil() as u64;
        if self.last_second != Some(second) {
            self.last_second = Some(second);
            debug!("{label}: {second}s");
        }
    }
}
