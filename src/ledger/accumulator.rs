use bon::Builder;
use chrono::{NaiveDate, TimeDelta};
use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};

use crate::{
    impact::{EnvironmentalFactors, EnvironmentalImpact},
    ingest::{DuplicateTimestamps, Reading},
    ledger::{History, HistoryEntry, Ledger, MonthKey},
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Integration {
    /// Mean of the two neighbouring samples over the gap.
    #[default]
    Trapezoidal,

    /// Later sample's power over the gap.
    Rectangular,
}

#[serde_as]
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationSettings {
    pub method: Integration,

    /// Gaps longer than this contribute no energy.
    #[serde_as(as = "DurationSeconds<i64>")]
    #[serde(rename = "max_gap_seconds")]
    pub max_gap: TimeDelta,

    /// Readings above this are treated as garbage.
    #[serde(rename = "max_power_kw")]
    pub max_power: Kilowatts,

    pub duplicate_timestamps: DuplicateTimestamps,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            method: Integration::default(),
            max_gap: TimeDelta::minutes(30),
            max_power: Kilowatts::from(100.0),
            duplicate_timestamps: DuplicateTimestamps::default(),
        }
    }
}

impl IntegrationSettings {
    /// Negative, non-finite and implausibly large power counts as zero.
    #[must_use]
    pub fn plausible_power(&self, power: Kilowatts) -> Kilowatts {
        if power.is_finite() && power >= Kilowatts::ZERO && power <= self.max_power {
            power
        } else {
            Kilowatts::ZERO
        }
    }

    /// Clamp the implausible power to zero with a warning.
    pub fn sanitize(&self, reading: Reading) -> Reading {
        let power = self.plausible_power(reading.power);
        if power != reading.power {
            warn!(
                timestamp = %reading.timestamp,
                power = ?reading.power,
                "implausible power, counting as zero",
            );
        }
        Reading { power, ..reading }
    }

    /// Energy produced between the two consecutive readings.
    pub fn integrate(&self, previous: &Reading, next: &Reading) -> KilowattHours {
        let gap = next.timestamp - previous.timestamp;
        if gap <= TimeDelta::zero() {
            return KilowattHours::ZERO;
        }
        if gap > self.max_gap {
            warn!(since = %previous.timestamp, until = %next.timestamp, "gap is too long, skipping");
            return KilowattHours::ZERO;
        }
        let power = match self.method {
            Integration::Trapezoidal => (previous.power + next.power) / 2.0,
            Integration::Rectangular => next.power,
        };
        power * gap
    }
}

/// Where the energy of a reading goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Placement {
    Current,

    /// Older than the tracked day: lifetime only.
    Stale,
}

/// Folds new readings into the [`Ledger`].
#[must_use]
#[derive(Builder)]
pub struct Accumulator<'a> {
    settings: &'a IntegrationSettings,
    factors: &'a EnvironmentalFactors,
}

impl Accumulator<'_> {
    /// Consume the readings, which must be new and in ascending timestamp order.
    #[instrument(skip_all)]
    pub fn accumulate<I>(&self, mut ledger: Ledger, readings: I) -> Ledger
    where
        I: IntoIterator<Item = Reading>,
    {
        let mut n_consumed = 0_usize;
        let mut produced = KilowattHours::ZERO;

        for reading in readings {
            let reading = self.settings.sanitize(reading);
            let energy = ledger
                .previous_reading
                .map_or(KilowattHours::ZERO, |previous| self.settings.integrate(&previous, &reading));

            match self.roll_over(&mut ledger, reading.timestamp.date()) {
                Placement::Current => ledger.totals.add(energy),
                Placement::Stale => {
                    warn!(timestamp = %reading.timestamp, "reading predates the tracked day");
                    ledger.totals.lifetime += energy;
                }
            }

            ledger.previous_reading = Some(reading);
            ledger.cursor.advance(reading.timestamp);
            produced += energy;
            n_consumed += 1;
        }

        info!(
            n_consumed,
            ?produced,
            today = ?ledger.totals.day,
            month = ?ledger.totals.month,
            lifetime = ?ledger.totals.lifetime,
            "accumulated",
        );
        ledger
    }

    /// Close the tracked day and month if the reading belongs to later ones.
    fn roll_over(&self, ledger: &mut Ledger, date: NaiveDate) -> Placement {
        let totals = &mut ledger.totals;

        match totals.day_date {
            None => {
                totals.day_date = Some(date);
            }
            Some(tracked) if date < tracked => {
                return Placement::Stale;
            }
            Some(tracked) if date > tracked => {
                self.close_day(&mut ledger.history, tracked, totals.day);
                for skipped in tracked.iter_days().skip(1).take_while(|day| *day < date) {
                    self.close_day(&mut ledger.history, skipped, KilowattHours::ZERO);
                }
                totals.day = KilowattHours::ZERO;
                totals.day_date = Some(date);
            }
            Some(_) => {}
        }

        let month = MonthKey::of(date);
        match totals.month_key {
            None => {
                totals.month_key = Some(month);
            }
            Some(tracked) if month > tracked => {
                info!(%tracked, total = ?totals.month, "closing the month");
                totals.month = KilowattHours::ZERO;
                totals.month_key = Some(month);
            }
            Some(_) => {}
        }

        Placement::Current
    }

    fn close_day(&self, history: &mut History, date: NaiveDate, total: KilowattHours) {
        info!(%date, ?total, "closing the day");
        history.push(HistoryEntry {
            date,
            total,
            environmental: EnvironmentalImpact::compute(total, self.factors),
        });
    }
}
