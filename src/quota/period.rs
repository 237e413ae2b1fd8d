//! Calendar-month bucketing for usage counters

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// First day of a UTC calendar month. Two instants in the same month always
/// map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PeriodKey(NaiveDate);

impl PeriodKey {
    pub fn containing(now: DateTime<Utc>) -> Self {
        let date = now.date_naive();
        Self(date - Days::new(u64::from(date.day0())))
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    /// Rebuild a key from a stored date, normalising to the first of the month.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date - Days::new(u64::from(date.day0())))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}
