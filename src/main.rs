use std::process::ExitCode;

use clap::Parser;
use repoverlay::cli::{self, Command};
use repoverlay::commands;
use repoverlay::logging::{self, Log as _, Logger};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    if matches!(args.command, Command::Version) {
        commands::version::run();
        return ExitCode::SUCCESS;
    }

    let name = args.command.name();
    logging::init_subscriber(args.verbose, args.quiet, name);
    let log = Logger::new(name);
    log.debug(&format!("repoverlay {}", commands::version::version()));

    let result = match &args.command {
        Command::Clone(opts) => commands::clone::run(&args.global, opts, &log),
        Command::Sync(opts) => commands::sync::run(&args.global, opts, &log),
        Command::Unlink(opts) => commands::unlink::run(&args.global, opts, &log),
        other => commands::vcs::run(&args.global, other, &log),
    };

    log.print_summary();
    match result {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
