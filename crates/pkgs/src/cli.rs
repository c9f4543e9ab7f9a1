//! Argument parsing: the `clap` v4 derive surface.
//! Kept as pure data — no I/O, no store access — so `main.rs` is the only
//! place that turns a parsed `Cli` into action.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(name = "git-pkgs", version, about = "Index and query package-dependency history from git commits")]
pub struct Cli {
    /// Emit structured JSON instead of human-readable text.
    #[arg(long = "format", global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Suppress progress output and non-essential messages.
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable ANSI color output regardless of terminal capability.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Path to the repository's `.git` directory (defaults to discovery
    /// from the current directory, honoring `GIT_DIR`).
    #[arg(long = "git-dir", global = true)]
    pub git_dir: Option<PathBuf>,

    /// Path to the index database (defaults to `<git-dir>/pkgs.sqlite3`,
    /// overridable via `GIT_PKGS_DB`).
    #[arg(long = "db", global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the index from scratch by walking full branch history.
    Init {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        force: bool,
    },

    /// Resume indexing from the branch's last-analyzed commit.
    Update {
        #[arg(long)]
        branch: Option<String>,
    },

    /// List dependencies live at a commit (default: branch tip).
    List {
        #[arg(long)]
        commit: Option<String>,
        #[arg(long)]
        ecosystem: Option<String>,
        #[arg(long)]
        manifest: Option<String>,
    },

    /// Show the change history of a dependency name.
    History {
        name: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        until: Option<String>,
        #[arg(long)]
        ecosystem: Option<String>,
    },

    /// Show, for each live dependency, the change that introduced its
    /// current requirement.
    Blame {
        #[arg(long)]
        ecosystem: Option<String>,
    },

    /// List dependencies that haven't changed recently.
    Stale {
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        ecosystem: Option<String>,
    },

    /// Count aggregations of dependency changes.
    Stats {
        #[arg(long, value_enum, default_value_t = StatsByArg::Author)]
        by: StatsByArg,
        /// Shorthand for `--by author` (kept for the literal spec flag).
        #[arg(long = "by-author")]
        by_author: bool,
        #[arg(long)]
        ecosystem: Option<String>,
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        until: Option<String>,
    },

    /// Show the set difference between two points in history.
    Diff {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// `A..B` or `A...B` range form, in place of `--from`/`--to`.
        range: Option<String>,
    },

    /// Show every dependency change recorded against one commit.
    Show {
        #[arg(default_value = "HEAD")]
        reference: String,
    },

    /// Find manifest paths where a dependency name currently appears.
    Where {
        name: String,
        #[arg(short = 'C', long = "context", default_value_t = 0)]
        context: usize,
        #[arg(long)]
        ecosystem: Option<String>,
    },

    /// List change-bearing commits with their change counts.
    Log {
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        ecosystem: Option<String>,
        #[arg(short = 'n', long = "limit")]
        limit: Option<usize>,
    },

    /// Print resolved configuration, schema version, row counts, and
    /// tracked branches.
    Info,

    /// Detect a schema-version mismatch and wipe-and-reindex.
    Upgrade {
        #[arg(long)]
        branch: Option<String>,
        #[arg(long = "yes")]
        assume_yes: bool,
    },

    /// Emit a shell-completion script.
    Completions { shell: Shell },

    /// Git `textconv` driver: pretty-prints a manifest/lockfile blob read
    /// from stdin as a `name  requirement` table.
    #[command(name = "pkgs-textconv")]
    PkgsTextconv { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatsByArg {
    Author,
    Ecosystem,
    Manifest,
    Name,
}
