use std::{fs, io::ErrorKind, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    fs::write_atomically,
    ingest::{Cursor, Reading},
    ledger::{History, InitialTotals, PeriodTotals},
    prelude::*,
};

/// Everything carried between the runs.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub cursor: Cursor,

    /// Last consumed reading, the integration anchor for the next run.
    #[serde(default)]
    pub previous_reading: Option<Reading>,

    pub totals: PeriodTotals,

    #[serde(default)]
    pub history: History,
}

impl Ledger {
    pub fn bootstrap(initial: &InitialTotals) -> Self {
        Self {
            cursor: Cursor::default(),
            previous_reading: None,
            totals: PeriodTotals::bootstrap(initial),
            history: History::default(),
        }
    }

    /// Load the ledger, starting over when it is missing or cannot be parsed.
    ///
    /// Fails when the file exists but cannot be read, so that it never gets overwritten.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_or_bootstrap(path: &Path, initial: &InitialTotals) -> Result<Self> {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("no ledger yet, bootstrapping");
                return Ok(Self::bootstrap(initial));
            }
            Err(error) => {
                return Err(error).context("failed to read the ledger");
            }
        };
        match serde_json::from_slice::<Self>(&contents) {
            Ok(ledger) => {
                info!(
                    cursor = ?ledger.cursor.last_processed_at(),
                    n_history = ledger.history.len(),
                    "loaded the ledger",
                );
                Ok(ledger)
            }
            Err(error) => {
                warn!("corrupt ledger, bootstrapping: {error:#}");
                Ok(Self::bootstrap(initial))
            }
        }
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> Result {
        write_atomically(path, &serde_json::to_vec_pretty(self)?)?;
        info!(cursor = ?self.cursor.last_processed_at(), "saved the ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        impact::EnvironmentalImpact,
        ledger::{HistoryEntry, MonthKey},
        quantity::{energy::KilowattHours, power::Kilowatts},
    };

    fn initial() -> InitialTotals {
        InitialTotals {
            lifetime: KilowattHours::from(1234.5),
            month_start: KilowattHours::from(67.8),
        }
    }

    fn populated() -> Ledger {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let timestamp = date.and_hms_opt(13, 35, 0).unwrap();
        let mut ledger = Ledger::bootstrap(&initial());
        ledger.cursor = Cursor::at(timestamp);
        ledger.previous_reading =
            Some(Reading { timestamp, power: Kilowatts::from(1.234_567_890_123) });
        ledger.totals.day_date = Some(date);
        ledger.totals.month_key = Some(MonthKey::of(date));
        ledger.totals.day = KilowattHours::from(0.1 + 0.2);
        ledger.totals.lifetime = KilowattHours::from(1234.5 + 1.0 / 3.0);
        ledger.history.push(HistoryEntry {
            date: date.pred_opt().unwrap(),
            total: KilowattHours::from(12.345_678),
            environmental: EnvironmentalImpact { co2_avoided_kg: 1.0 / 7.0, ..Default::default() },
        });
        ledger
    }

    #[test]
    fn test_round_trip_is_exact() -> Result {
        let directory = tempfile::tempdir()?;
        let path = directory.path().join("ledger.json");
        let ledger = populated();
        ledger.save(&path)?;
        assert_eq!(Ledger::load_or_bootstrap(&path, &initial())?, ledger);
        Ok(())
    }

    #[test]
    fn test_missing_file_bootstraps() -> Result {
        let directory = tempfile::tempdir()?;
        let ledger = Ledger::load_or_bootstrap(&directory.path().join("missing.json"), &initial())?;
        assert_eq!(ledger, Ledger::bootstrap(&initial()));
        Ok(())
    }

    #[test]
    fn test_corrupt_file_bootstraps() -> Result {
        let directory = tempfile::tempdir()?;
        let path = directory.path().join("ledger.json");
        fs::write(&path, "{\"totals\": 42")?;
        assert_eq!(Ledger::load_or_bootstrap(&path, &initial())?, Ledger::bootstrap(&initial()));
        Ok(())
    }

    #[test]
    fn test_unreadable_file_fails() -> Result {
        let directory = tempfile::tempdir()?;
        let path = directory.path().join("ledger.json");
        fs::create_dir(&path)?;
        assert!(Ledger::load_or_bootstrap(&path, &initial()).is_err());
        Ok(())
    }
}
