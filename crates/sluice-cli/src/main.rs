//! Sluice command-line migration runner.
//!
//! # Quick Start
//!
//! ```bash
//! # Write a new migration file into ./sql
//! sluice create add_users
//!
//! # Apply everything pending
//! sluice --uri sqlite:app.db
//!
//! # Undo the last migration
//! sluice --uri sqlite:app.db rollback
//! ```

mod commands;
mod style;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Sluice - reversible SQL schema migrations.
#[derive(Parser)]
#[command(name = "sluice")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags shared by every command. Anything given here overrides the
/// project configuration.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project directory holding sluice.toml.
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Directory containing migration files.
    #[arg(long, global = true)]
    pub migrations: Option<PathBuf>,

    /// Target revision (defaults to the latest migration).
    #[arg(short, long, global = true)]
    pub revision: Option<u64>,

    /// Metadata table, as `schema.table` or `table`.
    #[arg(long, global = true)]
    pub metadata: Option<String>,

    /// Seconds the whole run may take.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Database URI (sqlite:<path>, sqlite::memory:, postgres://...).
    #[arg(long, global = true)]
    pub uri: Option<String>,

    /// Do not store or use embedded rollbacks.
    #[arg(long, global = true)]
    pub no_embed: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create new, empty migration files.
    Create {
        /// Migration names; one file is created per name.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Apply migrations up (or down) to the target revision.
    Apply,

    /// Roll back the most recently applied migrations.
    Rollback {
        /// Number of revisions to step back.
        #[arg(short, long, default_value = "1")]
        steps: u64,
    },

    /// Show which migrations are applied, pending or orphaned.
    Status,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let no_color = cli.global.no_color
        || std::env::var_os("NO_COLOR").is_some()
        || !std::io::stdout().is_terminal();
    style::set_no_color(no_color);

    init_logging(cli.global.verbose);

    let result = match cli.command {
        Some(Commands::Create { names }) => commands::migration::create(&cli.global, &names),
        Some(Commands::Apply) | None => commands::migration::apply(&cli.global),
        Some(Commands::Rollback { steps }) => commands::migration::rollback(&cli.global, steps),
        Some(Commands::Status) => commands::migration::status(&cli.global),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            style::print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
