use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{EngineError, LedgerCache, Money, ParsedFile, ResultEngine, discover_ledgers};

use super::{fold_ledgers, render_table, write_report};

pub const ACCOUNTS_REPORT: &str = "accounts.csv";

/// Running balance per account, iterated in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountBalances {
    order: Vec<String>,
    totals: HashMap<String, Money>,
}

impl AccountBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to `account`, opening it at 0 when unseen.
    pub fn add(&mut self, account: &str, delta: Money) -> ResultEngine<()> {
        match self.totals.get_mut(account) {
            Some(total) => {
                *total = total
                    .checked_add(delta)
                    .ok_or_else(|| EngineError::Overflow(account.to_string()))?;
            }
            None => {
                self.order.push(account.to_string());
                self.totals.insert(account.to_string(), delta);
            }
        }
        Ok(())
    }

    /// Fold `other` into `self`; accounts new to `self` keep `other`'s order.
    pub fn merge(&mut self, other: AccountBalances) -> ResultEngine<()> {
        let AccountBalances { order, mut totals } = other;
        for account in order {
            if let Some(total) = totals.remove(&account) {
                self.add(&account, total)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, account: &str) -> Option<Money> {
        self.totals.get(account).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Money)> {
        self.order.iter().filter_map(|account| {
            self.totals
                .get(account)
                .map(|total| (account.as_str(), *total))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Output of the accounts stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountsReport {
    pub output: PathBuf,
    pub balances: AccountBalances,
}

fn fold_file(file: &ParsedFile) -> ResultEngine<AccountBalances> {
    let mut balances = AccountBalances::new();
    for row in file.rows() {
        if let Some(account) = row.account() {
            balances.add(account, row.delta()?)?;
        }
    }
    Ok(balances)
}

/// Balance of every account found in the ledgers of `source_dir`, written
/// to `output_dir/accounts.csv`.
pub async fn compute_account_balances(
    cache: &Arc<LedgerCache>,
    source_dir: &Path,
    output_dir: &Path,
) -> ResultEngine<AccountsReport> {
    let files = discover_ledgers(source_dir, None).await?;
    let file_count = files.len();

    let mut balances = AccountBalances::new();
    for partial in fold_ledgers(cache, files, fold_file).await? {
        balances.merge(partial)?;
    }
    tracing::info!(
        "accounts: {} accounts from {file_count} ledger files",
        balances.len()
    );

    let table = render_table(["Account", "Balance"], balances.iter())?;
    let output = write_report(output_dir, ACCOUNTS_REPORT, &table).await?;

    Ok(AccountsReport { output, balances })
}
