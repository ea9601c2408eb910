mod accumulator;
mod history;
mod state;
mod totals;

pub use self::{
    accumulator::{Accumulator, Integration, IntegrationSettings},
    history::{History, HistoryEntry},
    state::Ledger,
    totals::{InitialTotals, MonthKey, PeriodTotals},
};
