//! Classification of accounts into financial statement sections.
//!
//! The taxonomy is plain data: the statement stage receives it as an
//! argument and the application may load a replacement from its settings.
//! Group and account order is the order the statement prints them in.

use serde::{Deserialize, Serialize};

use crate::{LedgerRow, Money, ResultEngine};

/// Side on which an account group grows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Debits increase the balance (assets, expenses).
    #[default]
    Debit,
    /// Credits increase the balance (revenues, liabilities, equity).
    Credit,
}

impl NormalBalance {
    /// Movement of `row` as seen from this side of the ledger.
    pub fn delta(self, row: &LedgerRow) -> ResultEngine<Money> {
        let (debit, credit) = (row.debit()?, row.credit()?);
        let delta = match self {
            NormalBalance::Debit => debit.checked_sub(credit),
            NormalBalance::Credit => credit.checked_sub(debit),
        };
        delta.ok_or_else(|| row.overflow())
    }
}

/// An ordered list of accounts sharing a normal balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountGroup {
    pub normal_balance: NormalBalance,
    pub accounts: Vec<String>,
}

impl AccountGroup {
    fn new(normal_balance: NormalBalance, accounts: &[&str]) -> Self {
        Self {
            normal_balance,
            accounts: accounts.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeStatement {
    pub revenues: AccountGroup,
    pub expenses: AccountGroup,
}

impl Default for IncomeStatement {
    fn default() -> Self {
        Self {
            revenues: AccountGroup::new(NormalBalance::Credit, &["Sales Revenue"]),
            expenses: AccountGroup::new(
                NormalBalance::Debit,
                &[
                    "Cost of Goods Sold",
                    "Salaries Expense",
                    "Rent Expense",
                    "Utilities Expense",
                    "Interest Expense",
                    "Tax Expense",
                ],
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSheet {
    pub assets: AccountGroup,
    pub liabilities: AccountGroup,
    pub equity: AccountGroup,
}

impl Default for BalanceSheet {
    fn default() -> Self {
        Self {
            assets: AccountGroup::new(
                NormalBalance::Debit,
                &[
                    "Cash",
                    "Accounts Receivable",
                    "Inventory",
                    "Fixed Assets",
                    "Prepaid Expenses",
                ],
            ),
            liabilities: AccountGroup::new(
                NormalBalance::Credit,
                &[
                    "Accounts Payable",
                    "Loan Payable",
                    "Sales Tax Payable",
                    "Accrued Liabilities",
                    "Unearned Revenue",
                    "Dividends Payable",
                ],
            ),
            equity: AccountGroup::new(
                NormalBalance::Credit,
                &["Common Stock", "Retained Earnings"],
            ),
        }
    }
}

/// Section → group → accounts table driving the financial statement.
///
/// [`Taxonomy::default`] is the standard small-business chart of accounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    pub income_statement: IncomeStatement,
    pub balance_sheet: BalanceSheet,
}

impl Taxonomy {
    /// All groups in statement order.
    pub fn groups(&self) -> [&AccountGroup; 5] {
        [
            &self.income_statement.revenues,
            &self.income_statement.expenses,
            &self.balance_sheet.assets,
            &self.balance_sheet.liabilities,
            &self.balance_sheet.equity,
        ]
    }

    /// Every classified account in statement order.
    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.groups()
            .into_iter()
            .flat_map(|group| group.accounts.iter().map(String::as_str))
    }

    /// Normal balance of the first group listing `account`, `None` when the
    /// account is not classified.
    pub fn normal_balance_of(&self, account: &str) -> Option<NormalBalance> {
        self.groups()
            .into_iter()
            .find(|group| group.accounts.iter().any(|a| a == account))
            .map(|group| group.normal_balance)
    }
}
