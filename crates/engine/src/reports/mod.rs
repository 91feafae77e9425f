//! The report stages.
//!
//! Every stage discovers the ledger files of the source directory, folds each
//! file on its own task and merges the partial results in file-name order
//! before writing its report to the output directory.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::task::JoinSet;

use crate::{EngineError, LedgerCache, Money, ParsedFile, ResultEngine};

pub use accounts::{ACCOUNTS_REPORT, AccountBalances, AccountsReport, compute_account_balances};
pub use statement::{
    FS_REPORT, StatementReport, StatementTotals, compute_financial_statement, render_statement,
};
pub use yearly::{
    INVALID_YEAR, YEARLY_REPORT, YearlyCashFlow, YearlyReport, compute_yearly_cash_flow, year_key,
};

mod accounts;
mod statement;
mod yearly;

/// Read every file in `files` through `cache` and apply `fold` to it, one
/// task per file. Results come back in the order of `files`; the first
/// failing read or fold fails the whole call.
pub(crate) async fn fold_ledgers<T, F>(
    cache: &Arc<LedgerCache>,
    files: Vec<PathBuf>,
    fold: F,
) -> ResultEngine<Vec<T>>
where
    T: Send + 'static,
    F: Fn(&ParsedFile) -> ResultEngine<T> + Clone + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for (index, path) in files.into_iter().enumerate() {
        let cache = Arc::clone(cache);
        let fold = fold.clone();
        tasks.spawn(async move {
            let file = cache.read(&path).await?;
            Ok::<_, EngineError>((index, fold(&file)?))
        });
    }

    let mut partials = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        partials.push(joined??);
    }
    partials.sort_by_key(|(index, _)| *index);

    Ok(partials.into_iter().map(|(_, partial)| partial).collect())
}

/// Render a two column `name,amount` table with a header row. Records are
/// joined by `\n` with no trailing newline.
pub(crate) fn render_table<'a, I>(header: [&str; 2], rows: I) -> ResultEngine<String>
where
    I: IntoIterator<Item = (&'a str, Money)>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for (name, amount) in rows {
        writer.write_record([name, amount.to_string().as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| EngineError::Csv(err.into_error().into()))?;
    let mut table = String::from_utf8_lossy(&bytes).into_owned();
    if table.ends_with('\n') {
        table.pop();
    }
    Ok(table)
}

/// Write `contents` to `output_dir/file_name`, creating the directory when
/// missing.
pub(crate) async fn write_report(
    output_dir: &Path,
    file_name: &str,
    contents: &str,
) -> ResultEngine<PathBuf> {
    let path = output_dir.join(file_name);
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| EngineError::WriteReport {
            path: path.clone(),
            source,
        })?;
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| EngineError::WriteReport {
            path: path.clone(),
            source,
        })?;
    tracing::debug!("wrote {}", path.display());
    Ok(path)
}
