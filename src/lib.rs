//! # Finance Dashboard Engine
//!
//! A library for turning sparse, per-account balance and transaction records
//! into the regular monthly series behind a personal finance dashboard.
//!
//! ## Core Concepts
//!
//! - **Snapshot sources**: point-in-time balances (cash, property, debt,
//!   securities). The latest observation in a month is authoritative and
//!   gaps carry the last known value forward.
//! - **Event sources**: flows (credit card transactions). Values within a
//!   month are summed and gaps are zero — absence means nothing happened.
//! - **Manifest**: read-only reference metadata per account — type,
//!   retirement flag, debt linkage, and time-varying residence/investment
//!   windows — joined in for category rollups and debt-netting.
//! - **Pipelines**: pure functions composing the above into chart-ready
//!   shapes: 12-month trends with year-over-year comparison, allocation
//!   breakdowns, savings by year, and the accounts table.
//!
//! ## Example
//!
//! ```rust,ignore
//! use finance_dashboard_engine::*;
//!
//! let cash = SnapshotData::new("cash", cash_records);
//! let credit = EventData::new("credit", credit_records);
//! let manifest = Manifest::from_entries(manifest_entries);
//!
//! let anchor = MonthKey::current();
//! let trend = compute_value_over_last_12_months(&[&cash, &credit], anchor);
//! let allocation = compute_asset_allocation(&[&cash], &manifest, anchor);
//! ```

pub mod calendar;
pub mod error;
pub mod manifest;
pub mod pipelines;
pub mod schema;
pub mod series;
pub mod sources;
pub mod validation;

pub use calendar::{month_skeleton, MonthKey};
pub use error::{DashboardError, Result};
pub use manifest::{
    accounts_with_metadata, categorize, Category, EnrichedAccount, Manifest, MonthInterval,
    ValuationWindow,
};
pub use pipelines::*;
pub use schema::*;
pub use series::{forward_fill, rolling_average};
pub use sources::{
    AccountMonthValue, AccountValue, EventData, MonthChange, MonthValue, MonthlySource,
    SnapshotData,
};
pub use validation::*;
