use clap::{Parser, Subcommand};

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "repoverlay",
    about = "Overlay files from another repository into this one as symlinks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Directory to search upward from for .repoverlay.yaml
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the overlay into .repoverlay/repo and create its links
    Clone(CloneOpts),
    /// Reconcile links with the current overlay contents
    Sync(SyncOpts),
    /// Remove overlay links and the managed exclude block
    Unlink(UnlinkOpts),
    /// Show git status of the overlay clone
    Status,
    /// Show git diff of the overlay clone
    Diff(PassthroughArgs),
    /// Fetch from the overlay's remote
    Fetch,
    /// Stage files in the overlay clone (everything when none are given)
    Add(FilesArgs),
    /// Commit staged changes in the overlay clone
    Commit(PassthroughArgs),
    /// Pull the overlay clone, then sync links
    Pull,
    /// Check out a ref in the overlay clone, then sync links
    Checkout(CheckoutArgs),
    /// Merge into the overlay clone, then sync links
    Merge(PassthroughArgs),
    /// Push overlay commits back to the source
    Push,
    /// Print version information
    Version,
}

/// Options for the `clone` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct CloneOpts {
    /// Re-clone over an existing clone and replace conflicting entries
    #[arg(short, long)]
    pub force: bool,
}

/// Options for the `sync` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct SyncOpts {
    /// Replace conflicting files, directories, and foreign symlinks
    #[arg(short, long)]
    pub force: bool,
}

/// Options for the `unlink` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct UnlinkOpts {
    /// Also delete .repoverlay/ (the clone) after removing links
    #[arg(long)]
    pub remove_repo: bool,

    /// Unlink even with uncommitted changes in the clone
    #[arg(short, long)]
    pub force: bool,
}

/// Extra arguments handed to git unchanged.
#[derive(Parser, Debug, Clone, Default)]
pub struct PassthroughArgs {
    /// Arguments passed through to git
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// File arguments for `add`.
#[derive(Parser, Debug, Clone, Default)]
pub struct FilesArgs {
    /// Paths relative to the overlay clone
    pub files: Vec<String>,
}

/// Arguments for `checkout`.
#[derive(Parser, Debug, Clone)]
pub struct CheckoutArgs {
    /// Branch, tag, or commit
    pub reference: String,
}

impl Command {
    /// Name used for the log file and summary.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Clone(_) => "clone",
            Self::Sync(_) => "sync",
            Self::Unlink(_) => "unlink",
            Self::Status => "status",
            Self::Diff(_) => "diff",
            Self::Fetch => "fetch",
            Self::Add(_) => "add",
            Self::Commit(_) => "commit",
            Self::Pull => "pull",
            Self::Checkout(_) => "checkout",
            Self::Merge(_) => "merge",
            Self::Push => "push",
            Self::Version => "version",
        }
    }
}
