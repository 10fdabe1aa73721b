// gridkit CLI - headless data grid views
// Loads rows and column descriptors, applies a stored view state and prints
// or exports the result.

mod exit_codes;
mod state;
mod table;
mod view;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use gridkit_config::{JsonFileStore, Settings};
use gridkit_io::LoadError;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use state::StateCommands;
use view::GridArgs;

#[derive(Parser)]
#[command(name = "gridkit")]
#[command(about = "Headless data grid: filter, sort, group and export tabular records")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/gridkit/settings.json)
    #[arg(long, global = true, env = "GRIDKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding stored view states (overrides storage.dir)
    #[arg(long, global = true, env = "GRIDKIT_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Log level on stderr: off, error, warn, info, debug, trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current view as a text table
    #[command(after_help = "\
Examples:
  gridkit show --rows people.json --columns columns.json
  gridkit show --rows people.csv --columns columns.json --view people --search ann
  gridkit show --rows people.json --columns columns.json --view people --limit 20")]
    Show {
        #[command(flatten)]
        grid: GridArgs,

        /// Print at most this many rows
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Export the current view as CSV
    #[command(after_help = "\
Visible columns in display order; filtered and sorted rows. Grouping is
ignored and collapsed groups are included.

Examples:
  gridkit export --rows people.json --columns columns.json --view people
  gridkit export --rows people.json --columns columns.json -o people.csv
  gridkit export --rows people.json --columns columns.json -o - | head -5")]
    Export {
        #[command(flatten)]
        grid: GridArgs,

        /// Output file (default: export-<date>.csv, `-` for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Inspect and edit stored view states
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let level = match cli.log_level.as_deref().map(str::parse::<LevelFilter>) {
        None => settings.log_level_filter(),
        Some(Ok(level)) => level,
        Some(Err(_)) => {
            eprintln!("error: invalid --log-level (expected off, error, warn, info, debug or trace)");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    init_logging(level);

    let store = JsonFileStore::new(cli.store_dir.clone().unwrap_or_else(|| settings.storage_dir()));
    log::debug!("view states in {}", store.dir().display());

    let result = match cli.command {
        Commands::Show { grid, limit } => view::cmd_show(&settings, store, &grid, limit),
        Commands::Export { grid, output } => view::cmd_export(&settings, store, &grid, output),
        Commands::State { command } => state::run(store, command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(level: LevelFilter) {
    if level == LevelFilter::Off {
        return;
    }
    // Only fails when a logger is already installed
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Bad arguments, missing files, unknown keys.
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Rows or columns that exist but could not be read.
    pub fn load(path: &Path, err: LoadError) -> Self {
        Self::error(format!("{}: {}", path.display(), err))
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
