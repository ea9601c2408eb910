use std::{fs, path::Path};

use chrono::TimeDelta;
use serde::Deserialize;

use crate::{
    impact::{EnvironmentalFactors, FactorTable},
    ingest::CsvSettings,
    ledger::{InitialTotals, IntegrationSettings},
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

#[derive(Clone, Debug, Deserialize)]
pub struct PlantConfig {
    pub name: String,
    pub location: String,

    /// Informational only.
    pub installed_capacity_kwp: f64,
}

#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub plant: PlantConfig,

    /// Used only when there is no ledger yet.
    #[serde(default)]
    pub initial: InitialTotals,

    #[serde(default)]
    pub csv: CsvSettings,

    #[serde(default)]
    pub integration: IntegrationSettings,

    pub environmental: FactorTable,
}

impl Config {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("failed to read the configuration")?;
        let this: Self = toml::from_str(&contents).context("failed to parse the configuration")?;
        this.validate()?;
        info!(
            plant = %this.plant.name,
            capacity_kwp = this.plant.installed_capacity_kwp,
            "loaded the configuration",
        );
        Ok(this)
    }

    pub fn factors(&self) -> EnvironmentalFactors {
        self.environmental.into()
    }

    fn validate(&self) -> Result {
        let initial = [
            ("initial.lifetime_total_kwh", self.initial.lifetime),
            ("initial.month_start_total_kwh", self.initial.month_start),
        ];
        for (name, value) in initial {
            ensure!(value.is_finite() && value >= KilowattHours::ZERO, "`{name}` is negative");
        }
        ensure!(
            self.integration.max_gap > TimeDelta::zero(),
            "`integration.max_gap_seconds` must be positive",
        );
        ensure!(
            self.integration.max_power.is_finite() && self.integration.max_power > Kilowatts::ZERO,
            "`integration.max_power_kw` must be positive",
        );
        ensure!(
            !self.csv.timestamp_formats.is_empty(),
            "`csv.timestamp_formats` must not be empty",
        );
        ensure!(self.csv.delimiter.is_ascii(), "`csv.delimiter` must be an ASCII character");
        Ok(())
    }
}
