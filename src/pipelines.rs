//! Aggregation pipelines: compose the calendar, series, source, and manifest
//! layers into the exact data structures the chart layer consumes. Everything
//! here is a pure function over already-loaded records; re-running a pipeline
//! with the same inputs yields the same output.

use crate::calendar::{month_skeleton, MonthKey};
use crate::error::{DashboardError, Result};
use crate::manifest::{
    accounts_with_metadata, categorize, Category, Manifest, ValuationWindow,
};
use crate::schema::{AccountKind, SavingsRow};
use crate::series::rolling_average;
use crate::sources::{MonthValue, MonthlySource};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Trailing window for the smoothed trend lines.
const ROLLING_WINDOW: usize = 6;
/// The trend chart shows 12 months, but the rolling averages and the
/// year-over-year pairing need history beyond the first shown month.
const TREND_BUFFER_MONTHS: usize = 36;
const TREND_OUTPUT_MONTHS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: MonthKey,
    pub value: f64,
    pub last_year_value: f64,
    pub rolling_avg_6: Option<f64>,
    pub last_year_rolling_avg_6: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationSlice {
    pub category: Category,
    pub value: f64,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxTreatmentSlice {
    pub treatment: String,
    pub value: f64,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsDataset {
    pub category: String,
    /// One entry per year in `SavingsAllocation::years`.
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsAllocation {
    pub years: Vec<i32>,
    pub datasets: Vec<SavingsDataset>,
    /// One (non-positive) withdrawal total per year.
    pub withdrawals: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRow {
    pub account: String,
    pub title: String,
    pub value: f64,
    pub net_value: f64,
    pub category: String,
    pub tax_treatment: String,
    pub is_sub_row: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountsTable {
    pub non_retirement: Vec<AccountRow>,
    pub retirement: Vec<AccountRow>,
}

impl AccountsTable {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllTimeSeries {
    /// Monthly net totals, leading and trailing all-zero months trimmed.
    pub points: Vec<MonthValue>,
    /// Per-month category totals for the same range.
    pub category_breakdowns: BTreeMap<MonthKey, BTreeMap<Category, f64>>,
}

/// Current-month value per account, summed across all sources.
fn account_totals(sources: &[&dyn MonthlySource], anchor: MonthKey) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for source in sources {
        for row in source.value_by_account(anchor) {
            *totals.entry(row.account).or_insert(0.0) += row.value;
        }
    }
    totals
}

/// The last 12 months of summed source values, with the same month a year
/// earlier beside each entry and 6-month rolling averages over both series.
/// Always exactly 12 entries, ascending by month.
pub fn compute_value_over_last_12_months(
    sources: &[&dyn MonthlySource],
    anchor: MonthKey,
) -> Vec<TrendPoint> {
    let skeleton = month_skeleton(TREND_BUFFER_MONTHS, anchor);
    let mut totals: BTreeMap<MonthKey, f64> = skeleton.iter().map(|m| (*m, 0.0)).collect();

    for source in sources {
        for row in source.value_by_month(TREND_BUFFER_MONTHS, anchor) {
            if let Some(total) = totals.get_mut(&row.month) {
                *total += row.value;
            }
        }
    }

    let values: Vec<f64> = skeleton.iter().map(|m| totals[m]).collect();
    // Months more than 24 back have no prior-year month in the buffer; those
    // entries are truncated away below, so the 0 default never shows.
    let last_year_values: Vec<f64> = skeleton
        .iter()
        .map(|m| totals.get(&m.years_back(1)).copied().unwrap_or(0.0))
        .collect();

    let rolling = rolling_average(&values, ROLLING_WINDOW);
    let last_year_rolling = rolling_average(&last_year_values, ROLLING_WINDOW);

    debug!(
        "Trend over {} sources: {} buffered months, returning {}",
        sources.len(),
        TREND_BUFFER_MONTHS,
        TREND_OUTPUT_MONTHS
    );

    let mut points: Vec<TrendPoint> = skeleton
        .into_iter()
        .enumerate()
        .map(|(i, month)| TrendPoint {
            month,
            value: values[i],
            last_year_value: last_year_values[i],
            rolling_avg_6: rolling[i],
            last_year_rolling_avg_6: last_year_rolling[i],
        })
        .collect();

    points.split_off(TREND_BUFFER_MONTHS - TREND_OUTPUT_MONTHS)
}

/// Current-month net value per category, with each category's share of the
/// total. Sorted by value descending.
pub fn compute_asset_allocation(
    sources: &[&dyn MonthlySource],
    manifest: &Manifest,
    anchor: MonthKey,
) -> Vec<AllocationSlice> {
    let accounts =
        accounts_with_metadata(sources, manifest, ValuationWindow::CurrentMonth, anchor);

    let mut by_category: BTreeMap<Category, f64> = BTreeMap::new();
    for account in accounts {
        *by_category.entry(account.category).or_insert(0.0) += account.value;
    }

    let total: f64 = by_category.values().sum();
    let mut slices: Vec<AllocationSlice> = by_category
        .into_iter()
        .map(|(category, value)| AllocationSlice {
            category,
            value,
            proportion: if total != 0.0 { value / total } else { 0.0 },
        })
        .collect();

    slices.sort_by(|a, b| b.value.total_cmp(&a.value));
    slices
}

/// Savings contributions stacked by category and year, withdrawals kept as a
/// separate per-year total. Rows are split by sign before any summation, so a
/// deposit and a withdrawal against the same account in the same year stay
/// visible as two movements instead of cancelling.
pub fn compute_savings_allocation(
    rows: &[SavingsRow],
    manifest: &Manifest,
    anchor: MonthKey,
) -> SavingsAllocation {
    let mut deposits: BTreeMap<(i32, &str), f64> = BTreeMap::new();
    let mut withdrawals_by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for row in rows {
        if row.amount > 0.0 {
            *deposits.entry((row.year, row.account.as_str())).or_insert(0.0) += row.amount;
        } else if row.amount < 0.0 {
            *withdrawals_by_year.entry(row.year).or_insert(0.0) += row.amount;
        }
    }

    let mut by_year_category: BTreeMap<(i32, String), f64> = BTreeMap::new();
    for ((year, account), amount) in deposits {
        let Some(entry) = manifest.get(account) else {
            warn!("Account \"{}\" in savings rows not found in manifest; dropping", account);
            continue;
        };
        let category = categorize(entry, anchor).to_string();
        *by_year_category.entry((year, category)).or_insert(0.0) += amount;
    }

    let years: Vec<i32> = by_year_category
        .keys()
        .map(|(year, _)| *year)
        .chain(withdrawals_by_year.keys().copied())
        .collect::<BTreeSet<i32>>()
        .into_iter()
        .collect();

    let categories: BTreeSet<&String> = by_year_category.keys().map(|(_, c)| c).collect();

    let datasets = categories
        .into_iter()
        .map(|category| SavingsDataset {
            category: category.clone(),
            data: years
                .iter()
                .map(|year| {
                    by_year_category
                        .get(&(*year, category.clone()))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect(),
        })
        .collect();

    let withdrawals = years
        .iter()
        .map(|year| withdrawals_by_year.get(year).copied().unwrap_or(0.0))
        .collect();

    SavingsAllocation {
        years,
        datasets,
        withdrawals,
    }
}

/// Retirement balances grouped by tax treatment. Debt never counts as
/// retirement savings, and entries without a treatment default to "taxable".
/// Proportions are against the retirement-only total, sorted descending.
pub fn compute_retirement_tax_allocation(
    sources: &[&dyn MonthlySource],
    manifest: &Manifest,
    anchor: MonthKey,
) -> Vec<TaxTreatmentSlice> {
    let totals = account_totals(sources, anchor);

    let mut by_treatment: BTreeMap<String, f64> = BTreeMap::new();
    for entry in manifest.iter() {
        if !entry.retirement || entry.kind == AccountKind::Debt {
            continue;
        }
        let value = totals.get(&entry.account).copied().unwrap_or(0.0);
        if value == 0.0 {
            continue;
        }
        let treatment = entry.tax_treatment.clone().unwrap_or_else(|| "taxable".to_string());
        *by_treatment.entry(treatment).or_insert(0.0) += value;
    }

    let total: f64 = by_treatment.values().sum();
    let mut slices: Vec<TaxTreatmentSlice> = by_treatment
        .into_iter()
        .map(|(treatment, value)| TaxTreatmentSlice {
            treatment,
            value,
            proportion: if total > 0.0 { value / total } else { 0.0 },
        })
        .collect();

    slices.sort_by(|a, b| b.value.total_cmp(&a.value));
    slices
}

/// The accounts table: every non-debt account with a nonzero current balance,
/// each linked debt attached as an immediately-following sub-row, split into
/// retirement and non-retirement groups sorted by net value descending.
///
/// Debt participates only through its `debt_applies_to` link; unsecured debt
/// (no link) is excluded entirely rather than listed un-netted.
pub fn compute_accounts_table(
    sources: &[&dyn MonthlySource],
    manifest: &Manifest,
    anchor: MonthKey,
) -> AccountsTable {
    let totals = account_totals(sources, anchor);

    struct SubRow {
        account: String,
        title: String,
        value: f64,
    }

    let mut debt_by_target: BTreeMap<&str, Vec<SubRow>> = BTreeMap::new();
    for entry in manifest.iter() {
        if entry.kind != AccountKind::Debt {
            continue;
        }
        let Some(target) = entry.debt_applies_to.as_deref() else {
            continue;
        };
        let value = totals.get(&entry.account).copied().unwrap_or(0.0);
        if value == 0.0 {
            continue;
        }
        debt_by_target.entry(target).or_default().push(SubRow {
            account: entry.account.clone(),
            title: entry.display_title().to_string(),
            value,
        });
    }

    struct ParentRow {
        row: AccountRow,
        debts: Vec<SubRow>,
    }

    let mut non_retirement: Vec<ParentRow> = Vec::new();
    let mut retirement: Vec<ParentRow> = Vec::new();

    for entry in manifest.iter() {
        if entry.kind == AccountKind::Debt {
            continue;
        }
        let value = totals.get(&entry.account).copied().unwrap_or(0.0);
        if value == 0.0 {
            continue;
        }

        let debts = debt_by_target.remove(entry.account.as_str()).unwrap_or_default();
        let net_value = value + debts.iter().map(|d| d.value).sum::<f64>();

        let parent = ParentRow {
            row: AccountRow {
                account: entry.account.clone(),
                title: entry.display_title().to_string(),
                value,
                net_value,
                category: categorize(entry, anchor).to_string(),
                tax_treatment: entry
                    .tax_treatment
                    .clone()
                    .unwrap_or_else(|| "taxable".to_string()),
                is_sub_row: false,
            },
            debts,
        };

        if entry.retirement {
            retirement.push(parent);
        } else {
            non_retirement.push(parent);
        }
    }

    fn flatten(mut parents: Vec<ParentRow>) -> Vec<AccountRow> {
        parents.sort_by(|a, b| b.row.net_value.total_cmp(&a.row.net_value));
        let mut flat = Vec::new();
        for parent in parents {
            flat.push(parent.row);
            for debt in parent.debts {
                flat.push(AccountRow {
                    account: debt.account,
                    title: debt.title,
                    value: debt.value,
                    net_value: debt.value,
                    category: "mortgage".to_string(),
                    tax_treatment: "taxable".to_string(),
                    is_sub_row: true,
                });
            }
        }
        flat
    }

    AccountsTable {
        non_retirement: flatten(non_retirement),
        retirement: flatten(retirement),
    }
}

/// Net worth over the whole observed range: from the earliest observation in
/// any source through the anchor month, with leading and trailing all-zero
/// months trimmed and a per-month category breakdown alongside.
///
/// This is the one pipeline that can fail outright: with no observations, or
/// with nothing but zeros, there is no range to draw, and the caller needs to
/// show a real "no data" state rather than an empty chart.
pub fn compute_value_over_all_time(
    sources: &[&dyn MonthlySource],
    manifest: &Manifest,
    anchor: MonthKey,
) -> Result<AllTimeSeries> {
    let earliest = sources
        .iter()
        .filter_map(|s| s.earliest_month())
        .min()
        .ok_or_else(|| DashboardError::NoData("no observations in any source".to_string()))?;

    let months = anchor.months_since(earliest).max(1) as usize;
    let skeleton = month_skeleton(months, anchor);

    let mut totals: BTreeMap<MonthKey, f64> = skeleton.iter().map(|m| (*m, 0.0)).collect();
    for source in sources {
        for row in source.value_by_month(months, anchor) {
            if let Some(total) = totals.get_mut(&row.month) {
                *total += row.value;
            }
        }
    }

    let all_points: Vec<MonthValue> = skeleton
        .iter()
        .map(|month| MonthValue {
            month: *month,
            value: totals[month],
        })
        .collect();

    let first_nonzero = all_points
        .iter()
        .position(|p| p.value != 0.0)
        .ok_or_else(|| DashboardError::NoData("every month sums to zero".to_string()))?;
    let last_nonzero = all_points
        .iter()
        .rposition(|p| p.value != 0.0)
        .unwrap_or(first_nonzero);
    let points: Vec<MonthValue> = all_points[first_nonzero..=last_nonzero].to_vec();

    let first_month = points[0].month;
    let last_month = points[points.len() - 1].month;

    let mut category_breakdowns: BTreeMap<MonthKey, BTreeMap<Category, f64>> = BTreeMap::new();
    for row in accounts_with_metadata(sources, manifest, ValuationWindow::Trailing(months), anchor)
    {
        let Some(month) = row.month else { continue };
        if month < first_month || month > last_month {
            continue;
        }
        *category_breakdowns
            .entry(month)
            .or_default()
            .entry(row.category)
            .or_insert(0.0) += row.value;
    }

    debug!(
        "All-time series spans {} to {} ({} months)",
        first_month,
        last_month,
        points.len()
    );

    Ok(AllTimeSeries {
        points,
        category_breakdowns,
    })
}
