//! The [`Log`] seam and the step records behind the end-of-run summary.

/// How a pipeline step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Done; everything the step touched is correct.
    Ok,
    /// Done, but conflicts or advisories were left for the user.
    Warning,
    /// Nothing to do.
    Skipped,
    /// Reported only; nothing was changed.
    DryRun,
    /// The step failed.
    Failed,
}

impl StepStatus {
    /// Marker shown in front of the step name in the summary.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Warning => "!",
            Self::Skipped => "·",
            Self::DryRun => "~",
            Self::Failed => "✗",
        }
    }

    /// SGR color code for the summary line.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Ok => "32",
            Self::Warning => "33",
            Self::Skipped => "2",
            Self::DryRun => "36",
            Self::Failed => "31",
        }
    }
}

/// One recorded step (`acquire`, `validate`, `apply`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntry {
    pub name: String,
    pub status: StepStatus,
    /// Counts or a short reason.
    pub message: Option<String>,
}

impl StepEntry {
    /// The summary line, without color.
    #[must_use]
    pub fn line(&self) -> String {
        match &self.message {
            Some(message) => format!("{} {} ({message})", self.status.marker(), self.name),
            None => format!("{} {}", self.status.marker(), self.name),
        }
    }
}

/// Where the overlay engine and commands report progress.
///
/// [`Logger`](super::Logger) is the only production implementation. Engine
/// code takes `&dyn Log` so tests can pass an isolated logger.
pub trait Log: Send + Sync {
    /// Section header.
    fn stage(&self, msg: &str);
    fn info(&self, msg: &str);
    /// Shown on the console only with `--verbose`; always in the log file.
    fn debug(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
    /// An action that would have been taken without `--dry-run`.
    fn dry_run(&self, msg: &str);
    /// Remember a step outcome for the summary.
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>);
}
