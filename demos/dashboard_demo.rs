use anyhow::Result;
use chrono::NaiveDate;
use finance_dashboard_engine::*;

const CASH_CSV: &str = "\
date,account,value
2023-02-28,/chase/checking,5200.0
2023-09-30,/chase/checking,6100.0
2024-05-31,/chase/checking,7400.0
2023-02-28,/ally/savings,28000.0
2024-03-31,/ally/savings,35500.0
";

const PROPERTY_CSV: &str = "\
date,account,value
2023-01-01,/property/house,440000.0
2024-01-01,/property/house,465000.0
";

const DEBT_CSV: &str = "\
date,account,value
2023-01-01,/house/mortgage,-315000.0
2024-01-01,/house/mortgage,-302000.0
";

const SECURITIES_CSV: &str = "\
date,account,value
2023-06-30,/fidelity/401k,98000.0
2024-06-30,/fidelity/401k,127000.0
2024-06-30,/fidelity/brokerage,21000.0
";

fn load_records(csv_data: &str) -> Result<Vec<AccountRecord>> {
    let mut reader = csv::Reader::from_reader(csv_data.as_bytes());
    let records = reader.deserialize().collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn main() -> Result<()> {
    println!("📊 Personal Finance Dashboard Demo\n");

    let house = ManifestEntry {
        account: "/property/house".to_string(),
        kind: AccountKind::Property,
        retirement: false,
        debt_applies_to: None,
        primary_residence_since: NaiveDate::from_ymd_opt(2020, 5, 1),
        primary_residence_until: None,
        investment_since: None,
        investment_until: None,
        tax_treatment: None,
        title: Some("House".to_string()),
    };
    let mut mortgage = house.clone();
    mortgage.account = "/house/mortgage".to_string();
    mortgage.kind = AccountKind::Debt;
    mortgage.debt_applies_to = Some("/property/house".to_string());
    mortgage.primary_residence_since = None;
    mortgage.title = Some("House Mortgage".to_string());

    let mut checking = house.clone();
    checking.account = "/chase/checking".to_string();
    checking.kind = AccountKind::Cash;
    checking.primary_residence_since = None;
    checking.title = Some("Checking".to_string());

    let mut savings = checking.clone();
    savings.account = "/ally/savings".to_string();
    savings.title = Some("Savings".to_string());

    let mut k401 = checking.clone();
    k401.account = "/fidelity/401k".to_string();
    k401.kind = AccountKind::Securities;
    k401.retirement = true;
    k401.tax_treatment = Some("pre-tax".to_string());
    k401.title = Some("401(k)".to_string());

    let mut brokerage = checking.clone();
    brokerage.account = "/fidelity/brokerage".to_string();
    brokerage.kind = AccountKind::Securities;
    brokerage.title = Some("Brokerage".to_string());

    let manifest = Manifest::from_entries(vec![
        checking, savings, house, mortgage, k401, brokerage,
    ]);

    let cash = SnapshotData::new("cash", load_records(CASH_CSV)?);
    let property = SnapshotData::new("property", load_records(PROPERTY_CSV)?);
    let debt = SnapshotData::new("debt", load_records(DEBT_CSV)?);
    let securities = SnapshotData::new("securities", load_records(SECURITIES_CSV)?);
    let sources: Vec<&dyn MonthlySource> = vec![&cash, &property, &debt, &securities];

    let anchor = MonthKey::new(2024, 8)?;

    for warning in validate_all(&sources, &[], &manifest) {
        println!("⚠️  {}", warning);
    }

    println!("📈 Net worth, last 12 months (anchor {}):", anchor);
    for point in compute_value_over_last_12_months(&sources, anchor) {
        println!(
            "  {}: ${:>12.2}  (a year earlier: ${:>12.2})",
            point.month, point.value, point.last_year_value
        );
    }

    println!("\n🥧 Asset allocation:");
    for slice in compute_asset_allocation(&sources, &manifest, anchor) {
        println!(
            "  {:<22} ${:>12.2}  ({:.1}%)",
            slice.category.to_string(),
            slice.value,
            slice.proportion * 100.0
        );
    }

    println!("\n📋 Accounts table:");
    let table = compute_accounts_table(&sources, &manifest, anchor);
    for row in table.non_retirement.iter().chain(table.retirement.iter()) {
        let indent = if row.is_sub_row { "    " } else { "  " };
        println!(
            "{}{:<20} ${:>12.2}  net ${:>12.2}  [{}]",
            indent, row.title, row.value, row.net_value, row.category
        );
    }

    let all_time = compute_value_over_all_time(&sources, &manifest, anchor)?;
    println!(
        "\n🕰  All-time series: {} months, {} to {}",
        all_time.points.len(),
        all_time.points[0].month,
        all_time.points[all_time.points.len() - 1].month
    );

    Ok(())
}
