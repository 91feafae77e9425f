use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::{EngineError, LedgerCache, Money, ParsedFile, ResultEngine, discover_ledgers};

use super::{fold_ledgers, render_table, write_report};

pub const YEARLY_REPORT: &str = "yearly.csv";

/// Year key of rows whose date cannot be read.
pub const INVALID_YEAR: &str = "NaN";

const CASH_ACCOUNT: &str = "Cash";

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Cash movement per year key. Keys compare as strings, not numbers.
pub type YearlyCashFlow = BTreeMap<String, Money>;

/// Output of the yearly stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YearlyReport {
    pub output: PathBuf,
    pub cash_by_year: YearlyCashFlow,
}

fn parse_year(date: &str) -> Option<i32> {
    let date = date.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(date) {
        return Some(datetime.year());
    }
    if let Some(datetime) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(date, format).ok())
    {
        return Some(datetime.year());
    }
    if let Some(day) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
    {
        return Some(day.year());
    }
    // YYYY-MM
    if let Ok(day) = NaiveDate::parse_from_str(&format!("{date}-01"), "%Y-%m-%d") {
        return Some(day.year());
    }
    if date.len() == 4 && date.bytes().all(|b| b.is_ascii_digit()) {
        return date.parse().ok();
    }
    None
}

/// Calendar year of a ledger date field, [`INVALID_YEAR`] when the field is
/// missing or unreadable.
pub fn year_key(date: Option<&str>) -> String {
    date.and_then(parse_year)
        .map_or_else(|| INVALID_YEAR.to_string(), |year| year.to_string())
}

fn add_cash(cash_by_year: &mut YearlyCashFlow, year: String, amount: Money) -> ResultEngine<()> {
    let total = cash_by_year.entry(year).or_default();
    *total = total
        .checked_add(amount)
        .ok_or_else(|| EngineError::Overflow(CASH_ACCOUNT.to_string()))?;
    Ok(())
}

fn fold_file(file: &ParsedFile) -> ResultEngine<YearlyCashFlow> {
    let mut cash_by_year = YearlyCashFlow::new();
    for row in file.rows() {
        if row.account() == Some(CASH_ACCOUNT) {
            add_cash(&mut cash_by_year, year_key(row.date()), row.delta()?)?;
        }
    }
    Ok(cash_by_year)
}

/// Net movement of the `Cash` account per calendar year, written to
/// `output_dir/yearly.csv`. A `yearly.csv` inside `source_dir` is skipped.
pub async fn compute_yearly_cash_flow(
    cache: &Arc<LedgerCache>,
    source_dir: &Path,
    output_dir: &Path,
) -> ResultEngine<YearlyReport> {
    let files = discover_ledgers(source_dir, Some(YEARLY_REPORT)).await?;

    let mut cash_by_year = YearlyCashFlow::new();
    for partial in fold_ledgers(cache, files, fold_file).await? {
        for (year, amount) in partial {
            add_cash(&mut cash_by_year, year, amount)?;
        }
    }
    if cash_by_year.contains_key(INVALID_YEAR) {
        tracing::warn!("yearly: some cash rows have an unreadable date");
    }
    tracing::info!("yearly: cash movements over {} years", cash_by_year.len());

    let table = render_table(
        ["Financial Year", "Cash Balance"],
        cash_by_year.iter().map(|(year, amount)| (year.as_str(), *amount)),
    )?;
    let output = write_report(output_dir, YEARLY_REPORT, &table).await?;

    Ok(YearlyReport {
        output,
        cash_by_year,
    })
}
