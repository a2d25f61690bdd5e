//! The [`Logger`] handed to every command.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::file::default_log_path;
use super::types::{Log, StepEntry, StepStatus};
use super::{DRY_RUN_TARGET, STAGE_TARGET};

/// Emits `tracing` events and collects step outcomes for the summary.
///
/// Where events end up (console, log file) is decided by the subscriber
/// installed with [`init_subscriber`](super::init_subscriber); the logger
/// only remembers the log file path so the summary can point at it.
#[derive(Debug, Default)]
pub struct Logger {
    steps: Mutex<Vec<StepEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for `command`, pointing at its default log file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(default_log_path(command))
    }

    /// Logger whose summary names `log_file`.
    #[must_use]
    pub fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// The log file named in the summary, if any.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Steps recorded so far, in order.
    #[must_use]
    pub fn step_entries(&self) -> Vec<StepEntry> {
        self.steps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of steps recorded as [`StepStatus::Failed`].
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.steps.lock().map_or(0, |steps| {
            steps
                .iter()
                .filter(|s| s.status == StepStatus::Failed)
                .count()
        })
    }

    /// Print one line per recorded step, then the log file location.
    pub fn print_summary(&self) {
        let steps = self.step_entries();
        if steps.is_empty() {
            return;
        }
        self.stage("Summary");
        for step in &steps {
            tracing::info!("\x1b[{}m{}\x1b[0m", step.status.color(), step.line());
        }
        if let Some(path) = &self.log_file {
            tracing::info!("\x1b[2mlog: {}\x1b[0m", path.display());
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(StepEntry {
                name: name.to_string(),
                status,
                message: message.map(ToString::to_string),
            });
        }
    }
}
