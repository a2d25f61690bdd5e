//! Console and log-file output built on `tracing`.
//!
//! Commands report through [`Log`]; [`init_subscriber`] decides where the
//! events go. Every run also leaves a plain-text log under
//! `$XDG_CACHE_HOME/repoverlay/<command>.log`.

mod console;
mod file;
mod logger;
mod types;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{Layer as _, fmt};

pub use logger::Logger;
pub use types::{Log, StepEntry, StepStatus};

/// Target of stage header events.
const STAGE_TARGET: &str = "repoverlay::stage";
/// Target of dry-run action events.
const DRY_RUN_TARGET: &str = "repoverlay::dry_run";

/// The formatted `message` field of an event.
fn event_message(event: &tracing::Event<'_>) -> String {
    struct Message(String);

    impl tracing::field::Visit for Message {
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            if field.name() == "message" {
                value.clone_into(&mut self.0);
            }
        }

        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    let mut message = Message(String::new());
    event.record(&mut message);
    message.0
}

/// Install the global subscriber for `command`.
///
/// The console shows INFO and above (`verbose`: DEBUG, `quiet`: WARN only),
/// with warnings and errors on stderr. The log file always receives DEBUG.
pub fn init_subscriber(verbose: bool, quiet: bool, command: &str) {
    let console_level = match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (false, true) => LevelFilter::DEBUG,
        (false, false) => LevelFilter::INFO,
    };
    let writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));
    let console = fmt::layer()
        .event_format(console::ConsoleFormat)
        .with_writer(writer)
        .with_filter(console_level);
    let log_file = file::default_log_path(command)
        .and_then(|path| file::FileLayer::create(&path))
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console)
        .with(log_file)
        .init();
}

/// A [`Logger`] whose events go to a log file in a fresh temp directory,
/// through a thread-local subscriber. Keep the guard alive for the test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = tmp.path().join("test.log");
    let layer = file::FileLayer::create(&path).expect("create log file");
    let subscriber = tracing_subscriber::registry().with(layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (Logger::with_log_file(Some(path)), tmp, guard)
}
