//! Cross-checks between the loaded data files and the manifest. All checks
//! are advisory: they return (and log) human-readable warnings and never
//! abort an aggregation run.

use crate::manifest::Manifest;
use crate::schema::SavingsRow;
use crate::sources::MonthlySource;
use log::warn;
use std::collections::BTreeSet;

/// Every account observed in a data source should have a manifest entry.
/// Accounts without one still sum correctly into plain monthly totals, but
/// they drop out of every categorized output.
pub fn validate_sources(sources: &[&dyn MonthlySource], manifest: &Manifest) -> Vec<String> {
    let mut warnings = Vec::new();
    for source in sources {
        for account in source.accounts() {
            if manifest.get(account).is_none() {
                let message = format!(
                    "Account \"{}\" in source '{}' not found in manifest",
                    account,
                    source.source_name()
                );
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }
    warnings
}

/// Same check for savings rows, which reference accounts directly.
pub fn validate_savings_rows(rows: &[SavingsRow], manifest: &Manifest) -> Vec<String> {
    let accounts: BTreeSet<&str> = rows.iter().map(|r| r.account.as_str()).collect();

    let mut warnings = Vec::new();
    for account in accounts {
        if manifest.get(account).is_none() {
            let message = format!(
                "Account \"{}\" in savings rows not found in manifest",
                account
            );
            warn!("{}", message);
            warnings.push(message);
        }
    }
    warnings
}

/// A `debt_applies_to` link naming no manifest entry is tolerated (the debt
/// then nets against nothing), but it is almost always a typo worth flagging.
pub fn validate_debt_links(manifest: &Manifest) -> Vec<String> {
    let mut warnings = Vec::new();
    for entry in manifest.iter() {
        if let Some(target) = entry.debt_applies_to.as_deref() {
            if manifest.get(target).is_none() {
                let message = format!(
                    "Debt \"{}\" applies to \"{}\", which has no manifest entry",
                    entry.account, target
                );
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }
    warnings
}

/// Run every check and collect the warnings.
pub fn validate_all(
    sources: &[&dyn MonthlySource],
    savings_rows: &[SavingsRow],
    manifest: &Manifest,
) -> Vec<String> {
    let mut warnings = validate_sources(sources, manifest);
    warnings.extend(validate_savings_rows(savings_rows, manifest));
    warnings.extend(validate_debt_links(manifest));
    warnings
}
