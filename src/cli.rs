mod history;
mod process;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use self::{history::history, process::process};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// TOML configuration file.
    #[clap(long = "config", env = "CONFIG_PATH", default_value = "config.toml")]
    pub config_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: fold the latest export into the ledger and publish the snapshot.
    #[clap(name = "process")]
    Process(ProcessArgs),

    /// Print the persisted totals and the closed days.
    #[clap(name = "history")]
    History(HistoryArgs),
}

#[derive(Parser)]
pub struct StateArgs {
    /// Persisted ledger, created on the first run.
    #[clap(long = "state", env = "STATE_PATH", default_value = "data/ledger.json")]
    pub path: PathBuf,
}

#[derive(Parser)]
pub struct ProcessArgs {
    /// Portal export to ingest.
    #[clap(long = "csv", env = "CSV_PATH", default_value = "data/solar_export_latest.csv")]
    pub csv_path: PathBuf,

    #[clap(flatten)]
    pub state: StateArgs,

    /// Dashboard document to write.
    #[clap(long = "output", env = "OUTPUT_PATH", default_value = "solar_data.json")]
    pub output_path: PathBuf,

    /// Print the snapshot instead of persisting anything.
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct HistoryArgs {
    #[clap(flatten)]
    pub state: StateArgs,
}
