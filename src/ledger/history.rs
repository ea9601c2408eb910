use std::collections::VecDeque;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{impact::EnvironmentalImpact, quantity::energy::KilowattHours};

/// Closed day.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,

    #[serde(rename = "total_kwh")]
    pub total: KilowattHours,

    pub environmental: EnvironmentalImpact,
}

/// Bounded most-recent-first buffer of the closed days.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<HistoryEntry>", into = "Vec<HistoryEntry>")]
pub struct History(VecDeque<HistoryEntry>);

impl History {
    pub const CAPACITY: usize = 7;

    /// Insert the entry at the front, evicting the oldest one when full.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.0.push_front(entry);
        self.0.truncate(Self::CAPACITY);
    }

    /// The most recently closed day.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.0.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<HistoryEntry> {
        self.0.iter().copied().collect()
    }
}

impl From<Vec<HistoryEntry>> for History {
    /// Restore the ordering and the bound regardless of what was stored.
    fn from(entries: Vec<HistoryEntry>) -> Self {
        Self(
            entries
                .into_iter()
                .sorted_by(|lhs, rhs| rhs.date.cmp(&lhs.date))
                .dedup_by(|lhs, rhs| lhs.date == rhs.date)
                .take(Self::CAPACITY)
                .collect(),
        )
    }
}

impl From<History> for Vec<HistoryEntry> {
    fn from(history: History) -> Self {
        history.0.into()
    }
}
