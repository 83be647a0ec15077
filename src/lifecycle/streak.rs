//! Consecutive-day care streaks
//!
//! Care days are UTC calendar dates (see `core::calendar`). A streak stays
//! alive while the most recent care day is today or yesterday; anything
//! older means it has lapsed, even though care days exist.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::care::log::CareLog;
use crate::core::calendar::{care_day, days_between, previous_day};

/// Derived streak summary; recomputed on demand, never persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareStreakInfo {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_care_date: Option<NaiveDate>,
    /// Number of care actions per care day
    pub daily_counts: BTreeMap<NaiveDate, u32>,
}

impl CareStreakInfo {
    pub fn care_days(&self) -> usize {
        self.daily_counts.len()
    }

    pub fn cared_on(&self, day: NaiveDate) -> bool {
        self.daily_counts.contains_key(&day)
    }
}

/// Compute streaks from care timestamps in any order
pub fn calculate<I>(timestamps: I, today: NaiveDate) -> CareStreakInfo
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut daily_counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for ts in timestamps {
        *daily_counts.entry(care_day(ts)).or_insert(0) += 1;
    }

    let last_care_date = daily_counts.keys().next_back().copied();

    CareStreakInfo {
        current_streak: current_streak(&daily_counts, today),
        longest_streak: longest_streak(&daily_counts),
        last_care_date,
        daily_counts,
    }
}

/// Streaks for a care log as of `now`
pub fn from_log(log: &CareLog, now: DateTime<Utc>) -> CareStreakInfo {
    calculate(log.timestamps(), care_day(now))
}

fn current_streak(days: &BTreeMap<NaiveDate, u32>, today: NaiveDate) -> u32 {
    let mut descending = days.keys().rev();
    let Some(&most_recent) = descending.next() else {
        return 0;
    };

    // Lapsed: last care older than yesterday
    if days_between(most_recent, today) > 1 {
        return 0;
    }

    let mut count = 1;
    let mut last_counted = most_recent;
    for &day in descending {
        if day != previous_day(last_counted) {
            break;
        }
        count += 1;
        last_counted = day;
    }
    count
}

fn longest_streak(days: &BTreeMap<NaiveDate, u32>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for &day in days.keys() {
        run = match prev {
            Some(p) if days_between(p, day) == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }
    longest
}
