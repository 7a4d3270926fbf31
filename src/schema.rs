use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One observation from a data file: a balance snapshot or a transaction,
/// depending on which source it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountRecord {
    #[schemars(description = "Observation date in YYYY-MM-DD form (local wall-clock date)")]
    pub date: NaiveDate,

    #[schemars(
        description = "Hierarchical account path (e.g. '/bank/checking'), opaque beyond equality"
    )]
    pub account: String,

    #[schemars(
        description = "Balance for snapshot sources, signed flow amount for event sources"
    )]
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[schemars(description = "Liquid cash accounts: checking, savings, money market")]
    Cash,

    #[schemars(
        description = "Liabilities carried as negative balances: mortgages, loans, revolving credit"
    )]
    Debt,

    #[schemars(description = "Real property held directly")]
    Property,

    #[schemars(description = "Brokerage and retirement investment accounts")]
    Securities,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountKind::Cash => "cash",
            AccountKind::Debt => "debt",
            AccountKind::Property => "property",
            AccountKind::Securities => "securities",
        };
        f.write_str(name)
    }
}

/// Reference metadata for one account, loaded once per run from the manifest
/// file and treated as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ManifestEntry {
    #[schemars(description = "Account path this entry describes")]
    pub account: String,

    #[serde(rename = "type")]
    #[schemars(description = "Account classification")]
    pub kind: AccountKind,

    #[serde(default)]
    #[schemars(description = "True for retirement accounts (401k, IRA, etc.)")]
    pub retirement: bool,

    #[serde(default)]
    #[schemars(
        description = "For debt entries: the account path this debt nets against (e.g. a mortgage pointing at its house). Unset for unsecured debt."
    )]
    pub debt_applies_to: Option<String>,

    #[serde(default)]
    #[schemars(description = "First date the account was a primary residence, if ever")]
    pub primary_residence_since: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Last date the account was a primary residence; open-ended if unset")]
    pub primary_residence_until: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "First date the account was an investment property, if ever")]
    pub investment_since: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(
        description = "Last date the account was an investment property; open-ended if unset"
    )]
    pub investment_until: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(
        description = "Tax treatment label for retirement accounts (e.g. 'pre-tax', 'roth'). Defaults to 'taxable' when unset."
    )]
    pub tax_treatment: Option<String>,

    #[serde(default)]
    #[schemars(description = "Human-readable display name; falls back to the account path")]
    pub title: Option<String>,
}

/// One savings contribution or withdrawal. Multiple rows per year+account are
/// summed, but positive and negative rows are aggregated separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SavingsRow {
    pub year: i32,

    #[schemars(description = "Account path the contribution went to or came from")]
    pub account: String,

    #[schemars(description = "Positive for deposits, negative for withdrawals")]
    pub amount: f64,
}

/// Annual income summary. The engine carries these rows through untouched;
/// the consuming layer cross-references them against the aggregation outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeRow {
    pub year: i32,
    pub total_income: f64,
    pub federal_tax: f64,
    pub state_tax: f64,
    pub social_security: f64,
    pub medicare: f64,
}

/// Everything the loader hands the engine for one aggregation run. The JSON
/// schema generated from this type documents the loader contract: by the time
/// records reach the engine, dates are parsed and booleans are real booleans.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DashboardInputs {
    #[schemars(description = "Balance snapshots for cash accounts")]
    pub cash: Vec<AccountRecord>,

    #[schemars(description = "Balance snapshots for property")]
    pub property: Vec<AccountRecord>,

    #[schemars(description = "Balance snapshots for debt accounts (negative values)")]
    pub debt: Vec<AccountRecord>,

    #[schemars(description = "Balance snapshots for securities accounts")]
    pub securities: Vec<AccountRecord>,

    #[schemars(description = "Credit card transactions (flows, not balances)")]
    pub credit: Vec<AccountRecord>,

    #[schemars(description = "Account metadata manifest")]
    pub manifest: Vec<ManifestEntry>,

    #[schemars(description = "Savings contributions and withdrawals")]
    pub savings: Vec<SavingsRow>,

    #[schemars(description = "Annual income summaries (pass-through)")]
    pub income: Vec<IncomeRow>,
}

impl DashboardInputs {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardInputs)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}
