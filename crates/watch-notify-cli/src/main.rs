use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use commands::{check, clear, config, daemon, history, prune, status};
use watch_notify_config::PathManager;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "watchnotify")]
#[command(about = "Announce what you just watched on Trakt to a Telegram chat")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the watch history once and announce anything new
    #[command(long_about = "Fetch the most recent Trakt history, announce every item that has not been announced yet, record it, and advance the last-check cursor.")]
    Check {
        /// Print the messages that would be sent without sending or recording anything
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Run checks on a cron schedule
    #[command(long_about = "Run as a long-lived process that checks the watch history on a cron schedule (with seconds field). A check that is still running when the next tick fires causes that tick to be skipped. Ctrl-C stops the scheduler.")]
    Daemon {
        /// Cron schedule expression with seconds (e.g. '0 */10 * * * *')
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip the check normally run at startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_run: bool,

        /// Also write logs to a daily-rotated file (defaults to the logs directory)
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        log_file: Option<Option<PathBuf>>,
    },
    /// Show the raw recent history as returned by Trakt
    History {
        /// Number of entries to fetch (defaults to the configured history limit)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show the last check time and how many items are recorded
    Status,
    /// Forget announcements older than the given number of days
    Prune {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: u32,
    },
    /// Delete local state
    #[command(long_about = "Delete the state file (every item in the current feed window will be announced again on the next check) and/or a leftover run lock.")]
    Clear {
        /// Delete the notification records and cursor
        #[arg(long, action = ArgAction::SetTrue)]
        state: bool,

        /// Delete the run lock file
        #[arg(long, action = ArgAction::SetTrue)]
        lock: bool,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration (secrets masked)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Print the config file location
    Path,
    /// Write a template config file with placeholder credentials
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

/// `--log-file` alone means the standard daemon log location
fn daemon_log_path(flag: Option<Option<PathBuf>>) -> Option<PathBuf> {
    flag.map(|path| path.unwrap_or_else(|| PathManager::default().daemon_log_file()))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Daemon { log_file, .. } => daemon_log_path(log_file.clone()),
        _ => None,
    };
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let config_path = cli.config;

    match cli.command {
        Commands::Check { dry_run } => check::run_check(config_path, dry_run, &output).await,
        Commands::Daemon {
            schedule,
            no_startup_run,
            log_file: _,
        } => daemon::run_daemon(config_path, schedule, no_startup_run, &output).await,
        Commands::History { limit } => history::run_history(config_path, limit, &output).await,
        Commands::Status => status::run_status(config_path, &output),
        Commands::Prune { days } => prune::run_prune(config_path, days, &output),
        Commands::Clear { state, lock } => clear::run_clear(config_path, state, lock, &output),
        Commands::Config { cmd } => config::run_config(config_path, cmd, &output),
    }
}
