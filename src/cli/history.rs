use crate::{
    cli::HistoryArgs,
    config::Config,
    ledger::Ledger,
    prelude::*,
    tables::{build_history_table, build_totals_table},
};

pub fn history(args: &HistoryArgs, config: &Config) -> Result {
    let ledger = Ledger::load_or_bootstrap(&args.state.path, &config.initial)?;
    println!("{}", build_totals_table(&ledger));
    if ledger.history.is_empty() {
        info!("no closed days yet");
    } else {
        println!("{}", build_history_table(&ledger));
    }
    Ok(())
}
