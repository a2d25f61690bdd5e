//! The persistent per-command log file.
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::layer::Context;

use super::{DRY_RUN_TARGET, STAGE_TARGET, event_message};

/// `$XDG_CACHE_HOME/repoverlay`, else `~/.cache/repoverlay`.
fn log_dir() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CACHE_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?)
            .join(".cache"),
    };
    Some(base.join("repoverlay"))
}

/// Where the log for `command` is written.
pub(super) fn default_log_path(command: &str) -> Option<PathBuf> {
    log_dir().map(|dir| dir.join(format!("{command}.log")))
}

/// Remove terminal escape sequences.
///
/// CSI sequences (`ESC [ ... final`) are dropped up to their final byte;
/// any other escape drops only the character after `ESC`.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            for ch in chars.by_ref() {
                if ('@'..='~').contains(&ch) {
                    break;
                }
            }
        }
    }
    out
}

/// A layer that appends every event to the log file, one line each,
/// prefixed with a UTC timestamp and free of color codes.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<File>,
}

impl FileLayer {
    /// Truncate `path`, write a run header, and keep it open for appending.
    ///
    /// Returns `None` when the file cannot be created; logging to the
    /// console continues regardless.
    pub(super) fn create(path: &Path) -> Option<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()?;
        writeln!(
            file,
            "# repoverlay {} started {}",
            crate::commands::version::version(),
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        )
        .ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }

    fn line(level: Level, target: &str, msg: &str) -> String {
        let tag = match (level, target) {
            (Level::INFO, STAGE_TARGET) => "==>",
            (Level::INFO, DRY_RUN_TARGET) => "dry-run",
            (Level::ERROR, _) => "error",
            (Level::WARN, _) => "warn",
            (Level::DEBUG | Level::TRACE, _) => "debug",
            _ => "info",
        };
        format!(
            "{} {tag:<7} {}",
            chrono::Utc::now().format("%H:%M:%S"),
            strip_ansi(msg)
        )
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let line = Self::line(*meta.level(), meta.target(), &event_message(event));
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
        }
    }
}
