use std::path::Path;

use bon::bon;
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::PlantConfig,
    fs::write_atomically,
    impact::{EnvironmentalFactors, EnvironmentalImpact},
    ledger::{HistoryEntry, Ledger},
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

/// Field name fragments that must never be published.
const FORBIDDEN_FIELD_FRAGMENTS: [&str; 6] =
    ["password", "email", "token", "key", "secret", "credential"];

/// Dashboard document.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Local>,
    pub plant_name: String,
    pub location: String,
    pub current_power_w: i64,
    pub current_power_kw: f64,
    pub yesterday_total_kwh: f64,
    pub daily_total_kwh: f64,
    pub monthly_total_kwh: f64,
    pub lifetime_total_kwh: f64,
    pub yesterday_environmental: ImpactReport,
    pub daily_environmental: ImpactReport,
    pub monthly_environmental: ImpactReport,
    pub lifetime_environmental: ImpactReport,

    /// Closed days before yesterday, most recent first.
    pub past_7_days: Vec<DayReport>,
}

/// [`EnvironmentalImpact`] rounded for display.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub co2_avoided_kg: i64,
    pub trees_planted: i64,
    pub households_powered: f64,
    pub km_driven_equivalent: i64,
    pub km_flown_equivalent: i64,
    pub coal_saved_kg: i64,
    pub water_saved_litres: i64,
}

impl From<EnvironmentalImpact> for ImpactReport {
    #[expect(clippy::cast_possible_truncation)]
    fn from(impact: EnvironmentalImpact) -> Self {
        Self {
            co2_avoided_kg: impact.co2_avoided_kg.round() as i64,
            trees_planted: impact.trees_planted.round() as i64,
            households_powered: (impact.households_powered * 100.0).round() / 100.0,
            km_driven_equivalent: impact.km_driven_equivalent.round() as i64,
            km_flown_equivalent: impact.km_flown_equivalent.round() as i64,
            coal_saved_kg: impact.coal_saved_kg.round() as i64,
            water_saved_litres: impact.water_saved_litres.round() as i64,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub total_kwh: f64,
    pub environmental: ImpactReport,
}

impl From<&HistoryEntry> for DayReport {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            date: entry.date,
            total_kwh: entry.total.round_to(2),
            environmental: entry.environmental.into(),
        }
    }
}

#[bon]
impl Snapshot {
    #[builder]
    pub fn assemble(
        ledger: &Ledger,
        plant: &PlantConfig,
        factors: &EnvironmentalFactors,
        current_power: Kilowatts,
        now: DateTime<Local>,
    ) -> Self {
        let impact = |energy: KilowattHours| -> ImpactReport {
            EnvironmentalImpact::compute(energy, factors).into()
        };
        let totals = &ledger.totals;
        let (yesterday_total, yesterday_environmental) = ledger
            .history
            .latest()
            .map_or((KilowattHours::ZERO, EnvironmentalImpact::ZERO), |entry| {
                (entry.total, entry.environmental)
            });

        #[expect(clippy::cast_possible_truncation)]
        let current_power_w = current_power.to_watts().round() as i64;

        Self {
            timestamp: now,
            plant_name: plant.name.clone(),
            location: plant.location.clone(),
            current_power_w,
            current_power_kw: current_power.round_to(2),
            yesterday_total_kwh: yesterday_total.round_to(2),
            daily_total_kwh: totals.day.round_to(2),
            monthly_total_kwh: totals.month.round_to(2),
            lifetime_total_kwh: totals.lifetime.round_to(2),
            yesterday_environmental: yesterday_environmental.into(),
            daily_environmental: impact(totals.day),
            monthly_environmental: impact(totals.month),
            lifetime_environmental: impact(totals.lifetime),
            past_7_days: ledger.history.iter().skip(1).map(DayReport::from).collect(),
        }
    }
}

impl Snapshot {
    /// Check the document before it gets published.
    #[instrument(skip_all)]
    pub fn validate(&self, max_power: Kilowatts) -> Result {
        let totals = [
            ("current_power_kw", self.current_power_kw),
            ("yesterday_total_kwh", self.yesterday_total_kwh),
            ("daily_total_kwh", self.daily_total_kwh),
            ("monthly_total_kwh", self.monthly_total_kwh),
            ("lifetime_total_kwh", self.lifetime_total_kwh),
        ];
        for (name, value) in totals {
            ensure!(value.is_finite() && value >= 0.0, "suspicious `{name}`: {value}");
        }
        ensure!(
            self.current_power_kw <= max_power.0,
            "current power {} kW exceeds the plausible maximum of {max_power}",
            self.current_power_kw,
        );
        check_field_names(&serde_json::to_value(self)?)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn write_to(&self, path: &Path) -> Result {
        write_atomically(path, &serde_json::to_vec_pretty(self)?)?;
        info!("saved the snapshot");
        Ok(())
    }
}

fn check_field_names(value: &Value) -> Result {
    match value {
        Value::Object(map) => {
            for (name, value) in map {
                let lowercase = name.to_lowercase();
                if let Some(fragment) =
                    FORBIDDEN_FIELD_FRAGMENTS.iter().find(|fragment| lowercase.contains(**fragment))
                {
                    bail!("field `{name}` looks sensitive (`{fragment}`)");
                }
                check_field_names(value)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_field_names),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::ledger::InitialTotals;

    const FACTORS: EnvironmentalFactors = EnvironmentalFactors {
        co2_avoided_kg: 0.4,
        trees_planted: 0.02,
        households_powered: 0.0001,
        km_driven_equivalent: 2.0,
        km_flown_equivalent: 1.6,
        coal_saved_kg: 0.5,
        water_saved_litres: 2.0,
    };

    fn plant() -> PlantConfig {
        PlantConfig {
            name: "Muir College".to_string(),
            location: "La Jolla, CA".to_string(),
            installed_capacity_kwp: 120.0,
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 12, 18, 0, 0).unwrap()
    }

    fn entry(day: u32, total: f64) -> HistoryEntry {
        let total = KilowattHours::from(total);
        HistoryEntry {
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            total,
            environmental: EnvironmentalImpact::compute(total, &FACTORS),
        }
    }

    fn assemble(ledger: &Ledger, current_power: Kilowatts) -> Snapshot {
        Snapshot::assemble()
            .ledger(ledger)
            .plant(&plant())
            .factors(&FACTORS)
            .current_power(current_power)
            .now(now())
            .call()
    }

    fn ledger() -> Ledger {
        let mut ledger = Ledger::bootstrap(&InitialTotals {
            lifetime: KilowattHours::from(5000.0),
            month_start: KilowattHours::from(80.0),
        });
        ledger.totals.day = KilowattHours::from(12.346);
        ledger.totals.month = KilowattHours::from(92.346);
        ledger.totals.lifetime = KilowattHours::from(5012.3456);
        ledger
    }

    #[test]
    fn test_without_history() {
        let snapshot = assemble(&ledger(), Kilowatts::from(1.2346));
        assert_eq!(snapshot.current_power_w, 1235);
        assert_abs_diff_eq!(snapshot.current_power_kw, 1.23);
        assert_abs_diff_eq!(snapshot.yesterday_total_kwh, 0.0);
        assert_eq!(snapshot.yesterday_environmental, ImpactReport::from(EnvironmentalImpact::ZERO));
        assert_abs_diff_eq!(snapshot.daily_total_kwh, 12.35);
        assert_abs_diff_eq!(snapshot.lifetime_total_kwh, 5012.35);
        assert_eq!(snapshot.lifetime_environmental.co2_avoided_kg, 2005);
        assert_abs_diff_eq!(snapshot.lifetime_environmental.households_powered, 0.5);
        assert!(snapshot.past_7_days.is_empty());
    }

    #[test]
    fn test_yesterday_is_excluded_from_past_days() {
        let mut ledger = ledger();
        for (day, total) in [(8, 10.0), (9, 11.0), (10, 12.0), (11, 13.0)] {
            ledger.history.push(entry(day, total));
        }
        let snapshot = assemble(&ledger, Kilowatts::ZERO);
        assert_abs_diff_eq!(snapshot.yesterday_total_kwh, 13.0);
        let dates = snapshot.past_7_days.iter().map(|day| day.date.to_string()).collect::<Vec<_>>();
        assert_eq!(dates, ["2025-01-10", "2025-01-09", "2025-01-08"]);
        assert_eq!(snapshot.past_7_days[0].environmental.water_saved_litres, 24);
    }

    #[test]
    fn test_document_shape() -> Result {
        let mut ledger = ledger();
        ledger.history.push(entry(10, 10.0));
        ledger.history.push(entry(11, 11.0));
        let value = serde_json::to_value(assemble(&ledger, Kilowatts::from(2.0)))?;
        for field in [
            "timestamp",
            "plant_name",
            "location",
            "yesterday_total_kwh",
            "daily_total_kwh",
            "monthly_total_kwh",
            "lifetime_total_kwh",
            "yesterday_environmental",
            "daily_environmental",
            "monthly_environmental",
            "lifetime_environmental",
            "past_7_days",
        ] {
            assert!(value.get(field).is_some(), "missing `{field}`");
        }
        assert_eq!(value["plant_name"], json!("Muir College"));
        assert_eq!(value["past_7_days"][0]["date"], json!("2025-01-10"));
        assert_eq!(value["past_7_days"][0]["total_kwh"], json!(10.0));
        assert_eq!(value["daily_environmental"]["trees_planted"], json!(0));
        Ok(())
    }

    #[test]
    fn test_validate() -> Result {
        let max_power = Kilowatts::from(100.0);
        assemble(&ledger(), Kilowatts::from(2.0)).validate(max_power)?;

        let mut snapshot = assemble(&ledger(), Kilowatts::from(2.0));
        snapshot.daily_total_kwh = -1.0;
        assert!(snapshot.validate(max_power).is_err());

        let snapshot = assemble(&ledger(), Kilowatts::from(200.0));
        assert!(snapshot.validate(max_power).is_err());
        Ok(())
    }

    #[test]
    fn test_check_field_names() {
        assert!(check_field_names(&json!({"past": [{"date": "2025-01-10"}]})).is_ok());
        assert!(check_field_names(&json!({"past": [{"api_key": "x"}]})).is_err());
        assert!(check_field_names(&json!({"Password": 1})).is_err());
    }
}
