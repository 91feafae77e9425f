//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`ReadDir`] thrown when the ledger directory cannot be listed.
//! - [`ReadLedger`] thrown when a ledger file cannot be read.
//! - [`WriteReport`] thrown when a report cannot be written.
//! - [`UnknownStage`] thrown when a stage name is not recognised.
//! - [`AmountOutOfRange`] thrown when an amount field is a number too large
//!   to represent.
//! - [`Overflow`] thrown when a running total leaves the representable range.
//!
//! Malformed amounts and dates are never errors: they are recovered while
//! aggregating.
//!
//!  [`ReadDir`]: EngineError::ReadDir
//!  [`ReadLedger`]: EngineError::ReadLedger
//!  [`WriteReport`]: EngineError::WriteReport
//!  [`UnknownStage`]: EngineError::UnknownStage
//!  [`AmountOutOfRange`]: EngineError::AmountOutOfRange
//!  [`Overflow`]: EngineError::Overflow
use std::{io, path::PathBuf};

use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to list ledger directory \"{}\": {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("failed to read ledger file \"{}\": {source}", path.display())]
    ReadLedger { path: PathBuf, source: io::Error },
    #[error("failed to write report \"{}\": {source}", path.display())]
    WriteReport { path: PathBuf, source: io::Error },
    #[error("failed to serialize report: {0}")]
    Csv(#[from] csv::Error),
    #[error("ledger task failed: {0}")]
    Task(String),
    #[error("\"{0}\" is not a report stage")]
    UnknownStage(String),
    #[error("amount \"{0}\" is out of range")]
    AmountOutOfRange(String),
    #[error("balance of \"{0}\" overflowed")]
    Overflow(String),
}

impl EngineError {
    /// Render the error together with its chain of sources, one per line.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str("\n    caused by: ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Task(value.to_string())
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ReadDir { path: a, .. }, Self::ReadDir { path: b, .. }) => a == b,
            (Self::ReadLedger { path: a, .. }, Self::ReadLedger { path: b, .. }) => a == b,
            (Self::WriteReport { path: a, .. }, Self::WriteReport { path: b, .. }) => a == b,
            (Self::Csv(a), Self::Csv(b)) => a.to_string() == b.to_string(),
            (Self::Task(a), Self::Task(b)) => a == b,
            (Self::UnknownStage(a), Self::UnknownStage(b)) => a == b,
            (Self::AmountOutOfRange(a), Self::AmountOutOfRange(b)) => a == b,
            (Self::Overflow(a), Self::Overflow(b)) => a == b,
            _ => false,
        }
    }
}
