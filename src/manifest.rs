//! Manifest resolution: joins observed account ids to their metadata,
//! resolves time-varying classification, and nets linked debt into the
//! assets it applies to.

use crate::calendar::MonthKey;
use crate::schema::{AccountKind, ManifestEntry};
use crate::sources::MonthlySource;
use log::warn;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// An inclusive month range with optionally open ends. Residence and
/// investment windows are the same rule over different manifest fields, so
/// the predicate lives here once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthInterval {
    pub since: Option<MonthKey>,
    pub until: Option<MonthKey>,
}

impl MonthInterval {
    pub fn contains(&self, month: MonthKey) -> bool {
        match (self.since, self.until) {
            (None, None) => false,
            (Some(since), None) => month >= since,
            (None, Some(until)) => month <= until,
            (Some(since), Some(until)) => month >= since && month <= until,
        }
    }
}

impl ManifestEntry {
    pub fn residence_interval(&self) -> MonthInterval {
        MonthInterval {
            since: self.primary_residence_since.map(MonthKey::from_date),
            until: self.primary_residence_until.map(MonthKey::from_date),
        }
    }

    pub fn investment_interval(&self) -> MonthInterval {
        MonthInterval {
            since: self.investment_since.map(MonthKey::from_date),
            until: self.investment_until.map(MonthKey::from_date),
        }
    }

    pub fn is_primary_residence(&self, month: MonthKey) -> bool {
        self.residence_interval().contains(month)
    }

    pub fn is_investment_property(&self, month: MonthKey) -> bool {
        self.investment_interval().contains(month)
    }

    /// Display name, falling back to the account path.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.account)
    }
}

/// Derived classification of an account for a given month, used for
/// allocation rollups. Residence status beats investment status beats the
/// retirement flag beats the bare account kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    PrimaryResidence,
    InvestmentProperty,
    Retirement(AccountKind),
    Plain(AccountKind),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::PrimaryResidence => f.write_str("primary residence"),
            Category::InvestmentProperty => f.write_str("investment property"),
            Category::Retirement(kind) => write!(f, "retirement {}", kind),
            Category::Plain(kind) => write!(f, "{}", kind),
        }
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Classify one account for one month.
pub fn categorize(entry: &ManifestEntry, month: MonthKey) -> Category {
    if entry.is_primary_residence(month) {
        Category::PrimaryResidence
    } else if entry.is_investment_property(month) {
        Category::InvestmentProperty
    } else if entry.retirement {
        Category::Retirement(entry.kind)
    } else {
        Category::Plain(entry.kind)
    }
}

/// Manifest entries indexed by account id. The debt-netting step looks up
/// every account once per row, so the linear scan of a bare `Vec` is replaced
/// with a map built once per run.
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    index: HashMap<String, usize>,
}

impl Manifest {
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.account.clone(), i).is_some() {
                warn!("Duplicate manifest entry for \"{}\"; keeping the later one", entry.account);
            }
        }
        Self { entries, index }
    }

    pub fn get(&self, account: &str) -> Option<&ManifestEntry> {
        self.index.get(account).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which per-account values to pull from the sources before joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuationWindow {
    /// Latest values as of the anchor month.
    CurrentMonth,
    /// One row per account per month over a trailing skeleton of this many
    /// months. Every source is forward-filled per account here, so sparse
    /// debt sources still have a value to net in every month.
    Trailing(usize),
}

/// One account row after the metadata join and debt-netting. Debt rows are
/// consumed by the netting step and never appear in the output.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedAccount {
    pub account: String,
    pub value: f64,
    /// Set in the `Trailing` window, `None` for current-month rows.
    pub month: Option<MonthKey>,
    pub kind: AccountKind,
    pub retirement: bool,
    pub category: Category,
}

/// Join per-account values to the manifest, then fold each debt row into the
/// account its `debt_applies_to` names (matching the month in the trailing
/// window). Accounts missing from the manifest are warned about and dropped;
/// that is the only data-quality failure this path reports, and it is
/// non-fatal.
pub fn accounts_with_metadata(
    sources: &[&dyn MonthlySource],
    manifest: &Manifest,
    window: ValuationWindow,
    anchor: MonthKey,
) -> Vec<EnrichedAccount> {
    struct JoinedRow {
        account: String,
        value: f64,
        month: Option<MonthKey>,
        kind: AccountKind,
        retirement: bool,
        debt_applies_to: Option<String>,
        category: Category,
    }

    let mut joined: Vec<JoinedRow> = Vec::new();
    for source in sources {
        let raw: Vec<(String, f64, Option<MonthKey>)> = match window {
            ValuationWindow::CurrentMonth => source
                .value_by_account(anchor)
                .into_iter()
                .map(|row| (row.account, row.value, None))
                .collect(),
            ValuationWindow::Trailing(months) => source
                .value_by_account_by_month(months, anchor)
                .into_iter()
                .map(|row| (row.account, row.value, Some(row.month)))
                .collect(),
        };

        for (account, value, month) in raw {
            let Some(entry) = manifest.get(&account) else {
                warn!(
                    "Account \"{}\" in source '{}' not found in manifest; dropping",
                    account,
                    source.source_name()
                );
                continue;
            };

            let class_month = month.unwrap_or(anchor);
            joined.push(JoinedRow {
                account,
                value,
                month,
                kind: entry.kind,
                retirement: entry.retirement,
                debt_applies_to: entry.debt_applies_to.clone(),
                category: categorize(entry, class_month),
            });
        }
    }

    // Sum debt per (target, month). Current-month rows all carry month=None,
    // so the same key shape covers both windows.
    let mut debt_sums: HashMap<(&str, Option<MonthKey>), f64> = HashMap::new();
    for row in &joined {
        if row.kind != AccountKind::Debt {
            continue;
        }
        if let Some(target) = row.debt_applies_to.as_deref() {
            *debt_sums.entry((target, row.month)).or_insert(0.0) += row.value;
        }
    }

    let mut result = Vec::new();
    for row in &joined {
        if row.kind == AccountKind::Debt {
            continue;
        }
        let applicable_debt = debt_sums
            .get(&(row.account.as_str(), row.month))
            .copied()
            .unwrap_or(0.0);
        result.push(EnrichedAccount {
            account: row.account.clone(),
            value: row.value + applicable_debt,
            month: row.month,
            kind: row.kind,
            retirement: row.retirement,
            category: row.category,
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AccountRecord;
    use crate::sources::SnapshotData;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn entry(account: &str, kind: AccountKind) -> ManifestEntry {
        ManifestEntry {
            account: account.to_string(),
            kind,
            retirement: false,
            debt_applies_to: None,
            primary_residence_since: None,
            primary_residence_until: None,
            investment_since: None,
            investment_until: None,
            tax_treatment: None,
            title: None,
        }
    }

    fn record(d: (i32, u32, u32), account: &str, value: f64) -> AccountRecord {
        AccountRecord {
            date: date(d.0, d.1, d.2),
            account: account.to_string(),
            value,
        }
    }

    #[test]
    fn test_interval_contains_inclusive_bounds() {
        let interval = MonthInterval {
            since: Some(month(2020, 1)),
            until: Some(month(2022, 6)),
        };
        assert!(interval.contains(month(2020, 1)));
        assert!(interval.contains(month(2022, 6)));
        assert!(!interval.contains(month(2019, 12)));
        assert!(!interval.contains(month(2022, 7)));
    }

    #[test]
    fn test_interval_open_ends() {
        let since_only = MonthInterval {
            since: Some(month(2020, 1)),
            until: None,
        };
        assert!(since_only.contains(month(2030, 1)));
        assert!(!since_only.contains(month(2019, 12)));

        let until_only = MonthInterval {
            since: None,
            until: Some(month(2020, 1)),
        };
        assert!(until_only.contains(month(2010, 5)));
        assert!(!until_only.contains(month(2020, 2)));

        let unbounded = MonthInterval {
            since: None,
            until: None,
        };
        assert!(!unbounded.contains(month(2020, 1)));
    }

    #[test]
    fn test_categorize_priority_order() {
        let mut meta = entry("/property/house", AccountKind::Property);
        meta.primary_residence_since = Some(date(2020, 1, 1));
        meta.investment_since = Some(date(2020, 1, 1));
        meta.retirement = true;

        // Residence beats investment beats retirement.
        assert_eq!(categorize(&meta, month(2021, 6)), Category::PrimaryResidence);

        meta.primary_residence_until = Some(date(2020, 12, 31));
        assert_eq!(
            categorize(&meta, month(2021, 6)),
            Category::InvestmentProperty
        );

        meta.investment_until = Some(date(2020, 12, 31));
        assert_eq!(
            categorize(&meta, month(2021, 6)),
            Category::Retirement(AccountKind::Property)
        );

        meta.retirement = false;
        assert_eq!(
            categorize(&meta, month(2021, 6)),
            Category::Plain(AccountKind::Property)
        );
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::PrimaryResidence.to_string(), "primary residence");
        assert_eq!(
            Category::Retirement(AccountKind::Securities).to_string(),
            "retirement securities"
        );
        assert_eq!(Category::Plain(AccountKind::Cash).to_string(), "cash");
    }

    #[test]
    fn test_manifest_index_lookup() {
        let manifest = Manifest::from_entries(vec![
            entry("/bank/checking", AccountKind::Cash),
            entry("/property/house", AccountKind::Property),
        ]);

        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.get("/property/house").map(|e| e.kind),
            Some(AccountKind::Property)
        );
        assert!(manifest.get("/unknown").is_none());
    }

    #[test]
    fn test_debt_netting_current_month() {
        let manifest = Manifest::from_entries(vec![
            entry("/property/house", AccountKind::Property),
            {
                let mut debt = entry("/house/mortgage", AccountKind::Debt);
                debt.debt_applies_to = Some("/property/house".to_string());
                debt
            },
        ]);

        let property = SnapshotData::new(
            "property",
            vec![record((2024, 9, 1), "/property/house", 420_000.0)],
        );
        let debt = SnapshotData::new(
            "debt",
            vec![record((2024, 9, 1), "/house/mortgage", -280_000.0)],
        );

        let rows = accounts_with_metadata(
            &[&property, &debt],
            &manifest,
            ValuationWindow::CurrentMonth,
            month(2024, 9),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account, "/property/house");
        assert_eq!(rows[0].value, 140_000.0);
    }

    #[test]
    fn test_debt_netting_matches_month_in_trailing_window() {
        let manifest = Manifest::from_entries(vec![
            entry("/property/house", AccountKind::Property),
            {
                let mut debt = entry("/house/mortgage", AccountKind::Debt);
                debt.debt_applies_to = Some("/property/house".to_string());
                debt
            },
        ]);

        let property = SnapshotData::new(
            "property",
            vec![
                record((2024, 7, 1), "/property/house", 400_000.0),
                record((2024, 9, 1), "/property/house", 420_000.0),
            ],
        );
        // Sparse debt source: one observation, forward-filled per account.
        let debt = SnapshotData::new(
            "debt",
            vec![record((2024, 7, 1), "/house/mortgage", -300_000.0)],
        );

        let rows = accounts_with_metadata(
            &[&property, &debt],
            &manifest,
            ValuationWindow::Trailing(3),
            month(2024, 9),
        );

        let house: Vec<f64> = rows
            .iter()
            .filter(|r| r.account == "/property/house")
            .map(|r| r.value)
            .collect();
        // Debt carries into August and September despite no new observation.
        assert_eq!(house, vec![100_000.0, 100_000.0, 120_000.0]);
    }

    #[test]
    fn test_unknown_account_is_dropped() {
        let manifest = Manifest::from_entries(vec![entry("/bank/checking", AccountKind::Cash)]);
        let cash = SnapshotData::new(
            "cash",
            vec![
                record((2024, 9, 1), "/bank/checking", 100.0),
                record((2024, 9, 1), "/bank/mystery", 999.0),
            ],
        );

        let rows = accounts_with_metadata(
            &[&cash],
            &manifest,
            ValuationWindow::CurrentMonth,
            month(2024, 9),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account, "/bank/checking");
    }

    #[test]
    fn test_dangling_debt_link_nets_nothing() {
        let manifest = Manifest::from_entries(vec![
            entry("/bank/checking", AccountKind::Cash),
            {
                let mut debt = entry("/debt/loan", AccountKind::Debt);
                debt.debt_applies_to = Some("/property/sold-house".to_string());
                debt
            },
        ]);

        let cash = SnapshotData::new(
            "cash",
            vec![record((2024, 9, 1), "/bank/checking", 100.0)],
        );
        let debt = SnapshotData::new(
            "debt",
            vec![record((2024, 9, 1), "/debt/loan", -50.0)],
        );

        let rows = accounts_with_metadata(
            &[&cash, &debt],
            &manifest,
            ValuationWindow::CurrentMonth,
            month(2024, 9),
        );

        // The debt row disappears and nothing absorbs it.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 100.0);
    }
}
