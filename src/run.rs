use chrono::{DateTime, Local};
use itertools::Itertools;

use crate::{
    config::Config,
    ingest::Reader,
    ledger::{Accumulator, Ledger},
    prelude::*,
    quantity::power::Kilowatts,
    snapshot::Snapshot,
};

/// Result of a single run, nothing is persisted yet.
#[must_use]
pub struct Outcome {
    pub ledger: Ledger,
    pub snapshot: Snapshot,
}

/// Fold the export into the prior ledger and shape the dashboard document.
#[instrument(skip_all)]
pub fn process_run(
    csv: &str,
    prior: Ledger,
    config: &Config,
    now: DateTime<Local>,
) -> Result<Outcome> {
    let readings = Reader::new(&config.csv).read(csv)?.collect_vec();
    ensure!(!readings.is_empty(), "the export contains no usable readings");
    info!(n_readings = readings.len(), "read the export");

    let current_power = readings
        .iter()
        .max_by_key(|reading| reading.timestamp)
        .map_or(Kilowatts::ZERO, |reading| config.integration.plausible_power(reading.power));

    let new_readings = prior.cursor.select(readings, config.integration.duplicate_timestamps);
    let factors = config.factors();
    let ledger = Accumulator::builder()
        .settings(&config.integration)
        .factors(&factors)
        .build()
        .accumulate(prior, new_readings);

    let snapshot = Snapshot::assemble()
        .ledger(&ledger)
        .plant(&config.plant)
        .factors(&factors)
        .current_power(current_power)
        .now(now)
        .call();
    Ok(Outcome { ledger, snapshot })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::{
        config::PlantConfig,
        impact::{EnvironmentalFactors, FactorTable},
        ingest::{CsvSettings, PowerUnit},
        ledger::{InitialTotals, IntegrationSettings, MonthKey},
        quantity::energy::KilowattHours,
    };

    fn config() -> Config {
        Config {
            plant: PlantConfig {
                name: "Muir College".to_string(),
                location: "La Jolla, CA".to_string(),
                installed_capacity_kwp: 120.0,
            },
            initial: InitialTotals {
                lifetime: KilowattHours::from(5000.0),
                month_start: KilowattHours::from(80.0),
            },
            csv: CsvSettings { power_unit: PowerUnit::Kilowatts, ..CsvSettings::default() },
            integration: IntegrationSettings::default(),
            environmental: FactorTable::PerKilowattHour(EnvironmentalFactors {
                co2_avoided_kg: 0.4,
                trees_planted: 0.02,
                households_powered: 0.0001,
                km_driven_equivalent: 2.0,
                km_flown_equivalent: 1.6,
                coal_saved_kg: 0.5,
                water_saved_litres: 2.0,
            }),
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 11, 18, 0, 0).unwrap()
    }

    fn run(csv: &str, prior: Ledger) -> Result<Outcome> {
        process_run(csv, prior, &config(), now())
    }

    const RISING: &str = "Time,Power\n\
                          2025-01-10 12:00,0\n\
                          2025-01-10 12:05,1\n\
                          2025-01-10 12:10,2\n";

    #[test]
    fn test_three_rising_readings() -> Result {
        let outcome = run(RISING, Ledger::bootstrap(&config().initial))?;
        let ledger = &outcome.ledger;
        assert_abs_diff_eq!(ledger.totals.day.0, 1.0 / 6.0, epsilon = 1e-12);
        assert_eq!(
            ledger.cursor.last_processed_at(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap().and_hms_opt(12, 10, 0),
        );
        assert!(ledger.history.is_empty());
        assert_eq!(outcome.snapshot.current_power_w, 2000);
        assert_abs_diff_eq!(outcome.snapshot.daily_total_kwh, 0.17);
        Ok(())
    }

    #[test]
    fn test_implausible_current_power_is_zero() -> Result {
        let csv = "Time,Power\n2025-01-10 12:00,1\n2025-01-10 12:05,-2\n";
        let outcome = run(csv, Ledger::bootstrap(&config().initial))?;
        assert_eq!(outcome.snapshot.current_power_w, 0);
        assert_abs_diff_eq!(outcome.snapshot.current_power_kw, 0.0);
        Ok(())
    }

    #[test]
    fn test_idempotence() -> Result {
        let prior = Ledger::bootstrap(&config().initial);
        let first = run(RISING, prior.clone())?;
        let again = run(RISING, prior)?;
        assert_eq!(first.ledger, again.ledger);
        assert_eq!(first.snapshot, again.snapshot);

        // Re-processing the same export against the advanced ledger changes nothing.
        let second = run(RISING, first.ledger.clone())?;
        assert_eq!(second.ledger, first.ledger);
        Ok(())
    }

    #[test]
    fn test_overlapping_exports_do_not_double_count() -> Result {
        let first = run(RISING, Ledger::bootstrap(&config().initial))?;
        let overlapping = "Time,Power\n\
                           2025-01-10 12:05,1\n\
                           2025-01-10 12:10,2\n\
                           2025-01-10 12:15,2\n";
        let second = run(overlapping, first.ledger)?;

        // 1/6 kWh from the first run plus 2 kW over 5 minutes.
        assert_abs_diff_eq!(second.ledger.totals.day.0, 1.0 / 6.0 + 1.0 / 6.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_lifetime_is_monotonic() -> Result {
        let exports = [
            RISING,
            "Time,Power\n2025-01-10 12:20,-3\n2025-01-10 12:25,1\n",
            "Time,Power\n2025-01-11 08:00,1\n2025-01-11 08:05,1\n",
            "Time,Power\n2025-01-09 08:00,5\n",
        ];
        let mut ledger = Ledger::bootstrap(&config().initial);
        for export in exports {
            let lifetime = ledger.totals.lifetime;
            ledger = run(export, ledger)?.ledger;
            assert!(ledger.totals.lifetime >= lifetime);
        }
        Ok(())
    }

    #[test]
    fn test_next_day_closes_the_tracked_one() -> Result {
        let mut prior = Ledger::bootstrap(&config().initial);
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        prior.totals.day_date = Some(date);
        prior.totals.month_key = Some(MonthKey::of(date));
        prior.totals.day = KilowattHours::from(21.5);

        let csv = "Time,Power\n2025-01-11 09:00,1\n2025-01-11 09:30,1\n";
        let outcome = run(csv, prior)?;
        let closed = outcome.ledger.history.latest().unwrap();
        assert_eq!(closed.date, date);
        assert_abs_diff_eq!(closed.total.0, 21.5);
        assert_abs_diff_eq!(outcome.ledger.totals.day.0, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(outcome.snapshot.yesterday_total_kwh, 21.5);
        assert_eq!(outcome.snapshot.yesterday_environmental.co2_avoided_kg, 9);
        Ok(())
    }

    #[test]
    fn test_multi_day_gap() -> Result {
        let first = run(RISING, Ledger::bootstrap(&config().initial))?;
        let csv = "Time,Power\n2025-01-14 10:00,1\n2025-01-14 10:10,1\n";
        let outcome = run(csv, first.ledger)?;

        let closed = outcome.ledger.history.iter().map(|entry| entry.date.to_string()).collect_vec();
        assert_eq!(closed, ["2025-01-13", "2025-01-12", "2025-01-11", "2025-01-10"]);
        let snapshot = &outcome.snapshot;
        assert_abs_diff_eq!(snapshot.yesterday_total_kwh, 0.0);
        assert_eq!(snapshot.past_7_days.len(), 3);
        assert_abs_diff_eq!(snapshot.past_7_days[2].total_kwh, 0.17);
        Ok(())
    }

    #[test]
    fn test_empty_export_fails() {
        assert!(run("", Ledger::bootstrap(&config().initial)).is_err());
        assert!(run("Time,Power\n", Ledger::bootstrap(&config().initial)).is_err());
        assert!(run("Time,Power\nsoon,1\n", Ledger::bootstrap(&config().initial)).is_err());
    }
}
