use crate::error::{DashboardError, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month, the engine's unit of aggregation.
///
/// Renders as zero-padded `YYYY-MM`, and the derived ordering is
/// chronological, so `MonthKey` can be used directly as a sort or map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(DashboardError::InvalidMonthNumber(month));
        }
        Ok(Self { year, month })
    }

    /// Month assignment uses the date as-is (wall-clock local dates from the
    /// input files), never a UTC conversion.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current local month. Only the embedding boundary should call this;
    /// everything below it takes an explicit anchor month.
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The same calendar month `n` years earlier, for year-over-year pairing.
    pub fn years_back(&self, n: i32) -> Self {
        Self {
            year: self.year - n,
            month: self.month,
        }
    }

    /// Number of months from `earlier` up to and including `self`.
    /// Zero or negative when `earlier` is not actually earlier.
    pub fn months_since(&self, earlier: MonthKey) -> i32 {
        (self.year - earlier.year) * 12 + (self.month as i32 - earlier.month as i32) + 1
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| DashboardError::InvalidMonthKey(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| DashboardError::InvalidMonthKey(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| DashboardError::InvalidMonthKey(s.to_string()))?;
        Self::new(year, month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `n` consecutive months ending at `anchor` (inclusive), ascending.
pub fn month_skeleton(n: usize, anchor: MonthKey) -> Vec<MonthKey> {
    let mut months = Vec::with_capacity(n);
    let mut current = anchor;
    for _ in 0..n {
        months.push(current);
        current = current.pred();
    }
    months.reverse();
    months
}
