use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{ingest::Reading, prelude::*};

/// Which reading survives when the export repeats a timestamp.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateTimestamps {
    KeepFirst,

    #[default]
    KeepLast,
}

/// High-water mark of the consumed readings.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(rename = "last_processed_timestamp")]
    last_processed_at: Option<NaiveDateTime>,
}

impl Cursor {
    #[cfg(test)]
    pub const fn at(timestamp: NaiveDateTime) -> Self {
        Self { last_processed_at: Some(timestamp) }
    }

    #[must_use]
    pub const fn last_processed_at(self) -> Option<NaiveDateTime> {
        self.last_processed_at
    }

    /// Whether the reading has not been consumed yet.
    ///
    /// Equal timestamps count as consumed.
    #[must_use]
    pub fn is_new(self, reading: &Reading) -> bool {
        self.last_processed_at.is_none_or(|cursor| reading.timestamp > cursor)
    }

    /// Select the unseen readings in ascending timestamp order, one per timestamp.
    #[instrument(skip_all, fields(cursor = ?self.last_processed_at))]
    pub fn select<I>(self, readings: I, duplicates: DuplicateTimestamps) -> Vec<Reading>
    where
        I: IntoIterator<Item = Reading>,
    {
        let mut n_seen = 0_usize;
        let selected = readings
            .into_iter()
            .inspect(|_| n_seen += 1)
            .filter(|reading| self.is_new(reading))
            .sorted_by_key(|reading| reading.timestamp)
            .coalesce(|lhs, rhs| {
                if lhs.timestamp == rhs.timestamp {
                    debug!(timestamp = %lhs.timestamp, "duplicate timestamp");
                    Ok(match duplicates {
                        DuplicateTimestamps::KeepFirst => lhs,
                        DuplicateTimestamps::KeepLast => rhs,
                    })
                } else {
                    Err((lhs, rhs))
                }
            })
            .collect_vec();
        info!(n_seen, n_new = selected.len(), "selected new readings");
        selected
    }

    /// Move the cursor forward, never backward.
    pub fn advance(&mut self, timestamp: NaiveDateTime) {
        if self.last_processed_at.is_none_or(|cursor| timestamp > cursor) {
            self.last_processed_at = Some(timestamp);
        }
    }
}
