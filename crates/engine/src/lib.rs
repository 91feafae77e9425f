//! Report engine over a directory of ledger files.
//!
//! [`Engine::run_all`] produces three reports from the `.csv` ledgers of the
//! source directory, one stage after the other:
//!
//! - `accounts.csv`: balance of every account,
//! - `yearly.csv`: net cash movement per calendar year,
//! - `fs.csv`: income statement and balance sheet classified by a
//!   [`Taxonomy`].
//!
//! Each run reads every ledger at most once through its own [`LedgerCache`]
//! and the engine keeps the [`RunState`] of the last run for inspection.

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tokio::sync::{Mutex, RwLock};

pub use error::EngineError;
pub use ledger::{CacheStats, LEDGER_EXTENSION, LedgerCache, LedgerRow, ParsedFile, discover_ledgers};
pub use money::Money;
pub use reports::{
    ACCOUNTS_REPORT, AccountBalances, AccountsReport, FS_REPORT, INVALID_YEAR, StatementReport,
    StatementTotals, YEARLY_REPORT, YearlyCashFlow, YearlyReport, compute_account_balances,
    compute_financial_statement, compute_yearly_cash_flow, render_statement, year_key,
};
pub use run::{ErrorRecord, RunState, Stage, StageStatus};
pub use taxonomy::{AccountGroup, BalanceSheet, IncomeStatement, NormalBalance, Taxonomy};

mod error;
mod ledger;
mod money;
mod reports;
mod run;
mod taxonomy;

type ResultEngine<T> = Result<T, EngineError>;

/// Reports produced by a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub accounts: AccountsReport,
    pub yearly: YearlyReport,
    pub statement: StatementReport,
    pub cache: CacheStats,
}

#[derive(Debug)]
pub struct Engine {
    source_dir: PathBuf,
    output_dir: PathBuf,
    taxonomy: Taxonomy,
    state: RwLock<RunState>,
    run_lock: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Snapshot of the whole run state.
    pub async fn state(&self) -> RunState {
        self.state.read().await.clone()
    }

    pub async fn stage_state(&self, stage: Stage) -> StageStatus {
        self.state.read().await.stage(stage)
    }

    /// Failure of the last run, `None` if it succeeded or never ran.
    pub async fn error_record(&self) -> Option<ErrorRecord> {
        self.state.read().await.error().cloned()
    }

    /// Run the accounts, yearly and fs stages in this order.
    ///
    /// The first failing stage stops the run: every stage is marked `error`,
    /// the failure is recorded and returned. Reports written by the stages
    /// that already finished stay on disk. Concurrent calls run one after
    /// the other.
    pub async fn run_all(&self) -> ResultEngine<RunSummary> {
        let _running = self.run_lock.lock().await;
        self.update(RunState::cleared).await;

        let cache = Arc::new(LedgerCache::new());
        match self.run_stages(&cache).await {
            Ok(summary) => {
                tracing::info!(
                    "report run finished ({} ledger reads, {} cache hits)",
                    summary.cache.misses,
                    summary.cache.hits
                );
                Ok(summary)
            }
            Err(err) => {
                tracing::error!("report run failed: {err}");
                let record = ErrorRecord::from_error(&err);
                self.update(|state| state.failed(record)).await;
                Err(err)
            }
        }
    }

    async fn run_stages(&self, cache: &Arc<LedgerCache>) -> ResultEngine<RunSummary> {
        let source = self.source_dir.as_path();
        let output = self.output_dir.as_path();

        let accounts = self
            .stage(Stage::Accounts, compute_account_balances(cache, source, output))
            .await?;
        let yearly = self
            .stage(Stage::Yearly, compute_yearly_cash_flow(cache, source, output))
            .await?;
        let statement = self
            .stage(
                Stage::Fs,
                compute_financial_statement(cache, source, output, &self.taxonomy),
            )
            .await?;

        Ok(RunSummary {
            accounts,
            yearly,
            statement,
            cache: cache.stats(),
        })
    }

    async fn stage<T>(
        &self,
        stage: Stage,
        work: impl Future<Output = ResultEngine<T>>,
    ) -> ResultEngine<T> {
        self.update(|state| state.with_stage(stage, StageStatus::Starting))
            .await;
        tracing::info!("{stage}: starting");

        let started = Instant::now();
        let report = work.await?;
        let status = StageStatus::Finished(started.elapsed());

        self.update(|state| state.with_stage(stage, status)).await;
        tracing::info!("{stage}: {status}");
        Ok(report)
    }

    async fn update(&self, change: impl FnOnce(RunState) -> RunState) {
        let mut state = self.state.write().await;
        *state = change(std::mem::take(&mut *state));
    }
}

/// Builder for [`Engine`].
///
/// Defaults: ledgers are read from `tmp`, reports go to `out` and the
/// statement uses [`Taxonomy::default`].
#[derive(Debug)]
pub struct EngineBuilder {
    source_dir: PathBuf,
    output_dir: PathBuf,
    taxonomy: Taxonomy,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("tmp"),
            output_dir: PathBuf::from("out"),
            taxonomy: Taxonomy::default(),
        }
    }
}

impl EngineBuilder {
    /// Directory holding the ledger files.
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> EngineBuilder {
        self.source_dir = dir.into();
        self
    }

    /// Directory receiving the reports.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> EngineBuilder {
        self.output_dir = dir.into();
        self
    }

    pub fn taxonomy(mut self, taxonomy: Taxonomy) -> EngineBuilder {
        self.taxonomy = taxonomy;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            taxonomy: self.taxonomy,
            state: RwLock::new(RunState::default()),
            run_lock: Mutex::new(()),
        }
    }
}
