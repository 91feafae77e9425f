use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    AccountGroup, EngineError, LedgerCache, Money, NormalBalance, ParsedFile, ResultEngine,
    Taxonomy, discover_ledgers,
};

use super::{AccountBalances, fold_ledgers, write_report};

pub const FS_REPORT: &str = "fs.csv";

/// Figures computed while rendering the statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatementTotals {
    pub revenue: Money,
    pub expenses: Money,
    pub net_income: Money,
    pub assets: Money,
    pub liabilities: Money,
    /// Listed equity accounts plus net income.
    pub equity: Money,
    pub liabilities_and_equity: Money,
}

/// Output of the financial statement stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatementReport {
    pub output: PathBuf,
    pub text: String,
    pub totals: StatementTotals,
    /// Classified accounts in taxonomy order, unseen ones at 0.
    pub balances: AccountBalances,
}

fn fold_file(
    sides: &HashMap<String, NormalBalance>,
    file: &ParsedFile,
) -> ResultEngine<AccountBalances> {
    let mut balances = AccountBalances::new();
    for row in file.rows() {
        let Some(account) = row.account() else {
            continue;
        };
        if let Some(side) = sides.get(account) {
            balances.add(account, side.delta(row)?)?;
        }
    }
    Ok(balances)
}

fn sum(left: Money, right: Money, line: &str) -> ResultEngine<Money> {
    left.checked_add(right)
        .ok_or_else(|| EngineError::Overflow(line.to_string()))
}

fn emit_group(
    lines: &mut Vec<String>,
    group: &AccountGroup,
    balances: &AccountBalances,
    total_line: &str,
) -> ResultEngine<Money> {
    let mut total = Money::ZERO;
    for account in &group.accounts {
        let value = balances.get(account).unwrap_or_default();
        lines.push(format!("{account},{value}"));
        total = sum(total, value, total_line)?;
    }
    Ok(total)
}

/// Render the financial statement for `balances` classified by `taxonomy`.
///
/// Accounts missing from `balances` print as `0.00`. The closing
/// `Assets = Liabilities + Equity` line is informational only. Fails only
/// when a total overflows.
pub fn render_statement(
    taxonomy: &Taxonomy,
    balances: &AccountBalances,
) -> ResultEngine<(String, StatementTotals)> {
    let income = &taxonomy.income_statement;
    let sheet = &taxonomy.balance_sheet;
    let mut lines: Vec<String> = vec![
        "Basic Financial Statement".into(),
        String::new(),
        "Income Statement".into(),
    ];

    let revenue = emit_group(&mut lines, &income.revenues, balances, "Revenue")?;
    let expenses = emit_group(&mut lines, &income.expenses, balances, "Expenses")?;
    let net_income = revenue
        .checked_sub(expenses)
        .ok_or_else(|| EngineError::Overflow("Net Income".to_string()))?;
    lines.push(format!("Net Income,{net_income}"));

    lines.push(String::new());
    lines.push("Balance Sheet".into());
    lines.push("Assets".into());
    let assets = emit_group(&mut lines, &sheet.assets, balances, "Total Assets")?;
    lines.push(format!("Total Assets,{assets}"));

    lines.push(String::new());
    lines.push("Liabilities".into());
    let liabilities = emit_group(&mut lines, &sheet.liabilities, balances, "Total Liabilities")?;
    lines.push(format!("Total Liabilities,{liabilities}"));

    lines.push(String::new());
    lines.push("Equity".into());
    let listed_equity = emit_group(&mut lines, &sheet.equity, balances, "Total Equity")?;
    let equity = sum(listed_equity, net_income, "Total Equity")?;
    lines.push(format!("Retained Earnings (Net Income),{net_income}"));
    lines.push(format!("Total Equity,{equity}"));

    let liabilities_and_equity = sum(liabilities, equity, "Liabilities + Equity")?;
    lines.push(String::new());
    lines.push(format!(
        "Assets = Liabilities + Equity, {assets} = {liabilities_and_equity}"
    ));

    let totals = StatementTotals {
        revenue,
        expenses,
        net_income,
        assets,
        liabilities,
        equity,
        liabilities_and_equity,
    };
    Ok((lines.join("\n"), totals))
}

/// Normal balance of every classified account.
fn classify(taxonomy: &Taxonomy) -> HashMap<String, NormalBalance> {
    taxonomy
        .accounts()
        .filter_map(|account| Some((account.to_string(), taxonomy.normal_balance_of(account)?)))
        .collect()
}

/// Income statement and balance sheet of the ledgers in `source_dir`,
/// written to `output_dir/fs.csv`. A `fs.csv` inside `source_dir` is
/// skipped and accounts outside `taxonomy` are ignored.
pub async fn compute_financial_statement(
    cache: &Arc<LedgerCache>,
    source_dir: &Path,
    output_dir: &Path,
    taxonomy: &Taxonomy,
) -> ResultEngine<StatementReport> {
    let files = discover_ledgers(source_dir, Some(FS_REPORT)).await?;

    let sides = Arc::new(classify(taxonomy));
    let mut balances = AccountBalances::new();
    for account in taxonomy.accounts() {
        balances.add(account, Money::ZERO)?;
    }

    let partials = fold_ledgers(cache, files, move |file: &ParsedFile| {
        fold_file(&sides, file)
    })
    .await?;
    for partial in partials {
        balances.merge(partial)?;
    }

    let (text, totals) = render_statement(taxonomy, &balances)?;
    if totals.assets != totals.liabilities_and_equity {
        tracing::info!(
            "fs: statement does not balance ({} vs {})",
            totals.assets,
            totals.liabilities_and_equity
        );
    }
    let output = write_report(output_dir, FS_REPORT, &text).await?;

    Ok(StatementReport {
        output,
        text,
        totals,
        balances,
    })
}
