//! Terminal rendering of log events.
use std::fmt;

use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::{DRY_RUN_TARGET, STAGE_TARGET, event_message};

/// Renders events the way the commands expect them on a terminal: stage
/// headers, indented progress lines, and colored warning and error prefixes.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct ConsoleFormat;

impl ConsoleFormat {
    pub(super) fn render(level: Level, target: &str, msg: &str) -> String {
        match (level, target) {
            (Level::ERROR, _) => format!("\x1b[31merror:\x1b[0m {msg}"),
            (Level::WARN, _) => format!("\x1b[33mwarning:\x1b[0m {msg}"),
            (Level::INFO, STAGE_TARGET) => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            (Level::INFO, DRY_RUN_TARGET) => format!("  \x1b[36m[dry-run]\x1b[0m {msg}"),
            (Level::INFO, _) => format!("  {msg}"),
            _ => format!("  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        writeln!(
            writer,
            "{}",
            Self::render(*meta.level(), meta.target(), &event_message(event))
        )
    }
}
