//! Process entry point (C0): parses arguments, assembles
//! `RuntimeConfig` from CLI/env/repo-config, opens the repository and
//! store, dispatches to the matching command, and maps the result to an
//! exit code per (0 success, 1 recoverable error, 2 usage error —
//! the last one is clap's own exit code for parse failures).

use clap::{CommandFactory, Parser};
use pkgs_core::{EnvValues, RuntimeConfig};
use pkgs_git::GitCli;
use tracing_subscriber::EnvFilter;

use pkgs::cli::{Cli, Command, OutputFormat};
use pkgs::commands::{self, CommandContext};
use pkgs::config::load_repo_config;
use pkgs::error::CliError;
use pkgs::output::resolve_pager;

fn main() {
    let cli = Cli::parse();
    let json_output = matches!(cli.format, OutputFormat::Json);
    match run(cli) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            report_error(&err, json_output);
            std::process::exit(err.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    init_tracing(cli.quiet, cli.verbose);

    // Subcommands that never need a repository or a store.
    match &cli.command {
        Command::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(*shell, &mut command, name, &mut std::io::stdout());
            return Ok(());
        }
        Command::PkgsTextconv { path } => {
            return commands::run_textconv(path);
        }
        _ => {}
    }

    if let Some(git_dir) = &cli.git_dir {
        std::env::set_var("GIT_DIR", git_dir);
    }

    let git = GitCli::default();
    let cwd = std::env::current_dir().map_err(|e| CliError::Other(e.to_string()))?;
    let repo = pkgs_git::open(&cwd, &git)?;
    let repo_config = load_repo_config(&repo.root, &git);
    let env = EnvValues::from_process_env();

    let json = matches!(cli.format, OutputFormat::Json);
    let config = RuntimeConfig::resolve(
        cli.git_dir.clone(),
        None,
        cli.db.clone(),
        None,
        None,
        None,
        cli.quiet,
        json,
        cli.no_color,
        &env,
        &repo_config,
    );

    let db_path = config.db_path_for(&repo.git_dir);
    let mut store = pkgs_store::SqliteStore::open(&db_path)?;

    let pager = resolve_pager(repo_config.core_pager.as_deref());
    let mut ctx = CommandContext {
        repo: &repo,
        git: &git,
        store: &mut store,
        config: &config,
        pager,
    };

    dispatch(&mut ctx, cli.command, &db_path.to_string_lossy())
}

fn dispatch(ctx: &mut CommandContext, command: Command, db_path: &str) -> Result<(), CliError> {
    // `init` creates the schema itself; `update` and `upgrade` check it as
    // part of their own flow. Every other command reads the store and
    // needs a clear `NotInitialized`/`SchemaOutdated` error up front rather
    // than a raw "no such table" from the first query.
    if !matches!(command, Command::Init { .. } | Command::Update { .. } | Command::Upgrade { .. }) {
        ctx.store.check_schema_version(db_path)?;
    }

    match command {
        Command::Init { branch, since, force } => {
            commands::init(ctx, branch.as_deref(), since.as_deref(), force)
        }
        Command::Update { branch } => {
            commands::update(ctx, branch.as_deref())
        }
        Command::List { commit, ecosystem, manifest } => {
            commands::list(ctx, commit.as_deref(), ecosystem.as_deref(), manifest.as_deref())
        }
        Command::History { name, author, since, until, ecosystem } => commands::history(
            ctx,
            name.as_deref(),
            ecosystem.as_deref(),
            author.as_deref(),
            since.as_deref(),
            until.as_deref(),
        ),
        Command::Blame { ecosystem } => commands::blame(ctx, ecosystem.as_deref()),
        Command::Stale { days, ecosystem } => commands::stale(ctx, days, ecosystem.as_deref()),
        Command::Stats { by, by_author, ecosystem, since, until } => {
            commands::stats(ctx, by, by_author, ecosystem.as_deref(), since.as_deref(), until.as_deref())
        }
        Command::Diff { from, to, range } => commands::diff(ctx, from.as_deref(), to.as_deref(), range.as_deref()),
        Command::Show { reference } => commands::show(ctx, &reference),
        Command::Where { name, context, ecosystem } => {
            commands::where_cmd(ctx, &name, context, ecosystem.as_deref())
        }
        Command::Log { author, ecosystem, limit } => commands::log(ctx, author.as_deref(), ecosystem.as_deref(), limit),
        Command::Info => commands::info(ctx),
        Command::Upgrade { branch, assume_yes } => commands::upgrade(ctx, branch.as_deref(), assume_yes),
        Command::Completions { .. } | Command::PkgsTextconv { .. } => unreachable!("handled before store was opened"),
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn report_error(err: &CliError, json: bool) {
    if json {
        eprintln!("{}", err.to_json());
        return;
    }
    if let CliError::Cancelled = err {
        eprintln!("{err}");
        return;
    }
    eprintln!("error: {err}");
}
