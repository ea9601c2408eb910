#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod config;
mod fs;
mod impact;
mod ingest;
mod ledger;
mod prelude;
mod quantity;
mod run;
mod snapshot;
mod tables;

use clap::{Parser, crate_version};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Args, Command, history, process},
    config::Config,
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .without_time()
        .compact()
        .init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let config = Config::read_from(&args.config_path)?;

    match args.command {
        Command::Process(args) => {
            process(&args, &config)?;
        }
        Command::History(args) => {
            history(&args, &config)?;
        }
    }

    info!("done!");
    Ok(())
}
