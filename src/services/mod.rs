//! Command-line surface over [`OkrService`]. Every handler returns the JSON
//! document the binary prints; `Value::Null` means the target was not found.

pub mod key_results;
pub mod objectives;
pub mod overview;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::Result;
use crate::okr::OkrService;

pub use key_results::KeyResultCommand;
pub use objectives::ObjectiveCommand;
pub use overview::OverviewArgs;

#[derive(Debug, Parser)]
#[command(name = "okrtracker", version, about = "Track objectives and key results")]
pub struct Cli {
    /// Config file, defaults to <config_dir>/okrtracker/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create, read, update and delete objectives
    #[command(subcommand)]
    Objective(ObjectiveCommand),
    /// Manage the key results of an objective
    #[command(subcommand)]
    Kr(KeyResultCommand),
    /// Quarter rollup across all objectives
    Overview(OverviewArgs),
}

/// The acting user every operation is checked against.
#[derive(Debug, Clone, Args)]
pub struct Actor {
    #[arg(long = "user")]
    pub user_id: String,
}

/// `--x value` sets a field, `--clear-x` unsets it, neither leaves it alone.
pub(crate) fn set_or_clear(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

pub async fn execute(command: Command, service: &OkrService) -> Result<Value> {
    match command {
        Command::Objective(command) => command.execute(service).await,
        Command::Kr(command) => command.execute(service).await,
        Command::Overview(args) => args.execute(service).await,
    }
}
