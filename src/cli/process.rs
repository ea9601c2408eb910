use std::fs;

use chrono::Local;

use crate::{
    cli::ProcessArgs,
    config::Config,
    ledger::Ledger,
    prelude::*,
    run::{Outcome, process_run},
};

/// Scheduled job: nothing is written unless the whole run succeeds.
#[instrument(skip_all)]
pub fn process(args: &ProcessArgs, config: &Config) -> Result {
    let csv = fs::read_to_string(&args.csv_path)
        .with_context(|| format!("failed to read `{}`", args.csv_path.display()))?;
    let prior = Ledger::load_or_bootstrap(&args.state.path, &config.initial)?;

    let Outcome { ledger, snapshot } = process_run(&csv, prior, config, Local::now())?;
    snapshot.validate(config.integration.max_power)?;

    if args.dry_run {
        warn!("dry run, nothing is persisted");
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    // The snapshot goes first: a failed state write is retried from the old cursor.
    snapshot.write_to(&args.output_path)?;
    ledger.save(&args.state.path)?;
    Ok(())
}
