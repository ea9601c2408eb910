use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{prelude::*, quantity::energy::KilowattHours};

/// Calendar month, serialized as `YYYY-MM`.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s.split_once('-').with_context(|| format!("invalid month `{s}`"))?;
        let this = Self { year: year.parse()?, month: month.parse()? };
        ensure!((1..=12).contains(&this.month), "invalid month `{s}`");
        Ok(this)
    }
}

/// Bootstrap values for a deployment without persisted state.
#[derive(Copy, Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct InitialTotals {
    #[serde(rename = "lifetime_total_kwh")]
    pub lifetime: KilowattHours,

    /// Attached to the month of the first consumed reading.
    #[serde(rename = "month_start_total_kwh")]
    pub month_start: KilowattHours,
}

/// Running totals and the periods they belong to.
///
/// The keys are unset until the first reading is consumed, after which they follow the readings.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub day_date: Option<NaiveDate>,

    pub month_key: Option<MonthKey>,

    #[serde(rename = "day_total_kwh")]
    pub day: KilowattHours,

    #[serde(rename = "month_total_kwh")]
    pub month: KilowattHours,

    #[serde(rename = "lifetime_total_kwh")]
    pub lifetime: KilowattHours,
}

impl PeriodTotals {
    pub const fn bootstrap(initial: &InitialTotals) -> Self {
        Self {
            day_date: None,
            month_key: None,
            day: KilowattHours::ZERO,
            month: initial.month_start,
            lifetime: initial.lifetime,
        }
    }

    pub fn add(&mut self, energy: KilowattHours) {
        self.day += energy;
        self.month += energy;
        self.lifetime += energy;
    }
}
