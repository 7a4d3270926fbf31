//! Per-source time series with the two aggregation semantics the dashboard
//! needs: point-in-time balances (forward-filled) and flows (summed,
//! zero-filled). Both present the same surface through [`MonthlySource`] so
//! the pipelines can mix them freely.

use crate::calendar::{month_skeleton, MonthKey};
use crate::schema::AccountRecord;
use crate::series::forward_fill;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthValue {
    pub month: MonthKey,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountValue {
    pub account: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountMonthValue {
    pub month: MonthKey,
    pub account: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthChange {
    pub month: MonthKey,
    pub change: f64,
}

/// Common surface over snapshot and event sources. All methods take an
/// explicit `anchor` month (normally the current local month) so computations
/// stay pure and reproducible.
pub trait MonthlySource {
    fn source_name(&self) -> &str;

    /// Distinct account ids observed in this source, sorted.
    fn accounts(&self) -> Vec<&str>;

    /// Month of the oldest observation, if any.
    fn earliest_month(&self) -> Option<MonthKey>;

    /// Aggregate monthly values over a skeleton of `months` months ending at
    /// `anchor`. Always returns exactly `months` entries, ascending.
    fn value_by_month(&self, months: usize, anchor: MonthKey) -> Vec<MonthValue>;

    /// Per-account values for the anchor month. Zero-valued accounts are
    /// dropped; results are sorted by account id.
    fn value_by_account(&self, anchor: MonthKey) -> Vec<AccountValue>;

    /// Like `value_by_month` but preserving account identity, for categorized
    /// breakdowns. Grouped by account, then ascending by month.
    fn value_by_account_by_month(&self, months: usize, anchor: MonthKey) -> Vec<AccountMonthValue>;

    /// Month-over-month movement.
    fn change_by_month(&self, months: usize, anchor: MonthKey) -> Vec<MonthChange>;
}

fn group_by_account(records: &[AccountRecord]) -> BTreeMap<&str, Vec<&AccountRecord>> {
    let mut groups: BTreeMap<&str, Vec<&AccountRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.account.as_str()).or_default().push(record);
    }
    groups
}

/// Point-in-time balance observations for one family of accounts (e.g. all
/// cash accounts). Within a (month, account) cell the record with the largest
/// full date is authoritative; gaps between months carry the last known value
/// forward.
pub struct SnapshotData {
    source_name: String,
    records: Vec<AccountRecord>,
}

impl SnapshotData {
    pub fn new(source_name: impl Into<String>, records: Vec<AccountRecord>) -> Self {
        Self {
            source_name: source_name.into(),
            records,
        }
    }

    /// Authoritative value per (account, month): the latest-dated record wins.
    /// Ties on the full date resolve to the record appearing last in the
    /// input, which is deterministic for a fixed input file.
    fn latest_by_account_month(&self) -> BTreeMap<(&str, MonthKey), &AccountRecord> {
        let mut latest: BTreeMap<(&str, MonthKey), &AccountRecord> = BTreeMap::new();
        for record in &self.records {
            let key = (record.account.as_str(), MonthKey::from_date(record.date));
            let slot = latest.entry(key).or_insert(record);
            if record.date >= slot.date {
                *slot = record;
            }
        }
        latest
    }
}

impl MonthlySource for SnapshotData {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn accounts(&self) -> Vec<&str> {
        let unique: BTreeSet<&str> = self.records.iter().map(|r| r.account.as_str()).collect();
        unique.into_iter().collect()
    }

    fn earliest_month(&self) -> Option<MonthKey> {
        self.records
            .iter()
            .map(|r| MonthKey::from_date(r.date))
            .min()
    }

    fn value_by_month(&self, months: usize, anchor: MonthKey) -> Vec<MonthValue> {
        let mut monthly_sums: BTreeMap<MonthKey, f64> = BTreeMap::new();
        for ((_, month), record) in self.latest_by_account_month() {
            *monthly_sums.entry(month).or_insert(0.0) += record.value;
        }

        // Outer-join the raw sums onto the skeleton. Observed months outside
        // the skeleton stay in the timeline so that older observations seed
        // the forward-fill at the skeleton's left edge.
        let skeleton = month_skeleton(months, anchor);
        let mut timeline: BTreeMap<MonthKey, Option<f64>> =
            skeleton.iter().map(|m| (*m, None)).collect();
        for (month, sum) in monthly_sums {
            timeline.insert(month, Some(sum));
        }

        let ordered_months: Vec<MonthKey> = timeline.keys().copied().collect();
        let raw_values: Vec<Option<f64>> = timeline.values().copied().collect();
        let filled: BTreeMap<MonthKey, f64> = ordered_months
            .into_iter()
            .zip(forward_fill(&raw_values))
            .collect();

        skeleton
            .into_iter()
            .map(|month| MonthValue {
                month,
                value: filled.get(&month).copied().unwrap_or(0.0),
            })
            .collect()
    }

    fn value_by_account(&self, anchor: MonthKey) -> Vec<AccountValue> {
        let mut result = Vec::new();
        for (account, records) in group_by_account(&self.records) {
            let exact = records
                .iter()
                .filter(|r| MonthKey::from_date(r.date) == anchor)
                .max_by_key(|r| r.date);

            let value = match exact {
                Some(record) => record.value,
                None => match records.iter().max_by_key(|r| r.date) {
                    Some(latest) if MonthKey::from_date(latest.date) <= anchor => latest.value,
                    _ => 0.0,
                },
            };

            if value != 0.0 {
                result.push(AccountValue {
                    account: account.to_string(),
                    value,
                });
            }
        }
        result
    }

    fn value_by_account_by_month(&self, months: usize, anchor: MonthKey) -> Vec<AccountMonthValue> {
        let skeleton = month_skeleton(months, anchor);
        let latest = self.latest_by_account_month();

        let mut result = Vec::new();
        for account in self.accounts() {
            let mut last_value = 0.0;
            for &month in &skeleton {
                if let Some(record) = latest.get(&(account, month)) {
                    last_value = record.value;
                }
                result.push(AccountMonthValue {
                    month,
                    account: account.to_string(),
                    value: last_value,
                });
            }
        }
        result
    }

    fn change_by_month(&self, months: usize, anchor: MonthKey) -> Vec<MonthChange> {
        let values = self.value_by_month(months + 1, anchor);
        values
            .windows(2)
            .map(|pair| MonthChange {
                month: pair[1].month,
                change: pair[1].value - pair[0].value,
            })
            .collect()
    }
}

/// Flow observations (e.g. credit card transactions). Values within a month
/// are summed; a month with no events is 0, never forward-filled — absence
/// means nothing happened, not unknown.
pub struct EventData {
    source_name: String,
    records: Vec<AccountRecord>,
}

impl EventData {
    pub fn new(source_name: impl Into<String>, records: Vec<AccountRecord>) -> Self {
        Self {
            source_name: source_name.into(),
            records,
        }
    }

    fn monthly_sums(&self) -> BTreeMap<MonthKey, f64> {
        let mut sums: BTreeMap<MonthKey, f64> = BTreeMap::new();
        for record in &self.records {
            *sums.entry(MonthKey::from_date(record.date)).or_insert(0.0) += record.value;
        }
        sums
    }
}

impl MonthlySource for EventData {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn accounts(&self) -> Vec<&str> {
        let unique: BTreeSet<&str> = self.records.iter().map(|r| r.account.as_str()).collect();
        unique.into_iter().collect()
    }

    fn earliest_month(&self) -> Option<MonthKey> {
        self.records
            .iter()
            .map(|r| MonthKey::from_date(r.date))
            .min()
    }

    fn value_by_month(&self, months: usize, anchor: MonthKey) -> Vec<MonthValue> {
        let sums = self.monthly_sums();
        month_skeleton(months, anchor)
            .into_iter()
            .map(|month| MonthValue {
                month,
                value: sums.get(&month).copied().unwrap_or(0.0),
            })
            .collect()
    }

    fn value_by_account(&self, anchor: MonthKey) -> Vec<AccountValue> {
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for record in &self.records {
            if MonthKey::from_date(record.date) == anchor {
                *sums.entry(record.account.as_str()).or_insert(0.0) += record.value;
            }
        }

        sums.into_iter()
            .filter(|(_, value)| *value != 0.0)
            .map(|(account, value)| AccountValue {
                account: account.to_string(),
                value,
            })
            .collect()
    }

    fn value_by_account_by_month(&self, months: usize, anchor: MonthKey) -> Vec<AccountMonthValue> {
        let skeleton = month_skeleton(months, anchor);
        let mut sums: BTreeMap<(&str, MonthKey), f64> = BTreeMap::new();
        for record in &self.records {
            let key = (record.account.as_str(), MonthKey::from_date(record.date));
            *sums.entry(key).or_insert(0.0) += record.value;
        }

        let mut result = Vec::new();
        for account in self.accounts() {
            for &month in &skeleton {
                result.push(AccountMonthValue {
                    month,
                    account: account.to_string(),
                    value: sums.get(&(account, month)).copied().unwrap_or(0.0),
                });
            }
        }
        result
    }

    fn change_by_month(&self, months: usize, anchor: MonthKey) -> Vec<MonthChange> {
        // A flow has no separate notion of change: the flow is the change.
        self.value_by_month(months, anchor)
            .into_iter()
            .map(|row| MonthChange {
                month: row.month,
                change: row.value,
            })
            .collect()
    }
}
