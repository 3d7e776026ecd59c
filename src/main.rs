use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use scaffold::config::{PROJECT_DIR_ENV, ScaffoldConfig};
use scaffold::dispatch::{self, Command};
use scaffold::logging::init_logging;
use scaffold::state::FileStateStore;

#[derive(Parser)]
#[command(name = "scaffold")]
#[command(version, about = "Phase tracker for agent-driven project scaffolding")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show overall progress and the per-phase table
    Status,
    /// Print instructions for the next phase to work on
    Resume,
    /// Delete all recorded progress
    Reset,
    /// Record the start of a phase attempt
    Start {
        /// Phase number
        phase: u32,
    },
    /// Record a phase as completed
    Complete {
        /// Phase number
        phase: u32,
    },
    /// Record a failed phase attempt
    Fail {
        /// Phase number
        phase: u32,
        /// Failure message; remaining words are joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Status => Command::Status,
            Commands::Resume => Command::Resume,
            Commands::Reset => Command::Reset,
            Commands::Start { phase } => Command::Start { phase },
            Commands::Complete { phase } => Command::Complete { phase },
            Commands::Fail { phase, message } => Command::Fail {
                phase,
                message: message.join(" "),
            },
        }
    }
}

fn project_dir() -> Result<PathBuf> {
    match std::env::var_os(PROJECT_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => std::env::current_dir().context("Failed to get current directory"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let project_dir = project_dir()?;
    let config = ScaffoldConfig::new(project_dir.clone()).with_context(|| {
        format!(
            "Failed to load scaffold configuration for {}",
            project_dir.display()
        )
    })?;
    for warning in config.validate() {
        warn!("{}", warning);
    }

    let store = FileStateStore::for_config(&config);
    let command = Command::from(cli.command);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    dispatch::execute(store, config, &command, &mut out)
}
