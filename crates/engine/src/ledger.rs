//! Ledger files: discovery, parsing and the per-run read cache.
//!
//! A ledger file is plain text, one record per line, fields separated by a
//! bare `,` (there are no quoting rules). The canonical record layout is
//! `date,account,memo,debit,credit`.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::sync::OnceCell;

use crate::{EngineError, Money, ResultEngine};

/// Only directory entries ending with this suffix are ledgers.
pub const LEDGER_EXTENSION: &str = ".csv";

const DATE: usize = 0;
const ACCOUNT: usize = 1;
const MEMO: usize = 2;
const DEBIT: usize = 3;
const CREDIT: usize = 4;

/// One record of a ledger file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerRow(Vec<String>);

impl LedgerRow {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    fn parse(line: &str) -> Self {
        Self(line.split(',').map(str::to_string).collect())
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    /// Field at `index`, `None` when the row is shorter.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn date(&self) -> Option<&str> {
        self.field(DATE)
    }

    pub fn account(&self) -> Option<&str> {
        self.field(ACCOUNT)
    }

    pub fn memo(&self) -> Option<&str> {
        self.field(MEMO)
    }

    fn amount(&self, index: usize) -> ResultEngine<Money> {
        let field = self.field(index);
        Money::parse_field(field)
            .ok_or_else(|| EngineError::AmountOutOfRange(field.unwrap_or_default().to_string()))
    }

    pub fn debit(&self) -> ResultEngine<Money> {
        self.amount(DEBIT)
    }

    pub fn credit(&self) -> ResultEngine<Money> {
        self.amount(CREDIT)
    }

    /// Signed movement of the row: debit minus credit.
    pub fn delta(&self) -> ResultEngine<Money> {
        self.debit()?
            .checked_sub(self.credit()?)
            .ok_or_else(|| self.overflow())
    }

    /// Overflow error naming the row's account.
    pub(crate) fn overflow(&self) -> EngineError {
        EngineError::Overflow(self.account().unwrap_or_default().to_string())
    }
}

/// All the rows of one ledger file, in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFile {
    rows: Vec<LedgerRow>,
}

impl ParsedFile {
    /// Split `text` into rows. Trailing whitespace (including `\r`) is
    /// trimmed from every line and blank lines are skipped.
    pub fn parse(text: &str) -> Self {
        let rows = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(LedgerRow::parse)
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<LedgerRow> for ParsedFile {
    fn from_iter<T: IntoIterator<Item = LedgerRow>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Hit/miss counters of a [`LedgerCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from memory.
    pub hits: usize,
    /// Reads that went to storage.
    pub misses: usize,
}

/// Memoizes parsed ledger files by path.
///
/// Entries are never invalidated, so a cache must not outlive the run it
/// was created for. Concurrent first reads of the same path share a single
/// storage read. Failed reads are not cached.
#[derive(Debug, Default)]
pub struct LedgerCache {
    entries: Mutex<HashMap<PathBuf, Arc<OnceCell<Arc<ParsedFile>>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl LedgerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the parsed content of `path`, reading it on first use.
    pub async fn read(&self, path: &Path) -> ResultEngine<Arc<ParsedFile>> {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(path.to_path_buf()).or_default())
        };

        if let Some(file) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("cache hit for {}", path.display());
            return Ok(Arc::clone(file));
        }

        let mut loaded = false;
        let loading = &mut loaded;
        let file = cell
            .get_or_try_init(|| async move {
                *loading = true;
                self.misses.fetch_add(1, Ordering::Relaxed);
                load(path).await.map(Arc::new)
            })
            .await?;
        if !loaded {
            // Another reader finished loading while this one waited.
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("cache hit for {}", path.display());
        }
        Ok(Arc::clone(file))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Number of paths successfully read so far.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn load(path: &Path) -> ResultEngine<ParsedFile> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EngineError::ReadLedger {
            path: path.to_path_buf(),
            source,
        })?;
    let file = ParsedFile::parse(&text);
    tracing::debug!("parsed {} rows from {}", file.len(), path.display());
    Ok(file)
}

/// List the ledger files of `dir`, sorted by file name.
///
/// Every entry whose name ends with [`LEDGER_EXTENSION`] is a ledger, except
/// the one named `exclude` (a stage skipping its own output file).
pub async fn discover_ledgers(dir: &Path, exclude: Option<&str>) -> ResultEngine<Vec<PathBuf>> {
    let read_dir_err = |source| EngineError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_err)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.ends_with(LEDGER_EXTENSION) && exclude != Some(name.as_str()) {
            names.push(name);
        }
    }
    names.sort();

    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}
