//! Run bookkeeping: report stages, their status and the failure record.

use std::{fmt, str::FromStr, time::Duration};

use chrono::{SecondsFormat, Utc};

use crate::EngineError;

/// One of the three report stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Accounts,
    Yearly,
    Fs,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Accounts, Stage::Yearly, Stage::Fs];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Accounts => "accounts",
            Stage::Yearly => "yearly",
            Stage::Fs => "fs",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| EngineError::UnknownStage(s.to_string()))
    }
}

/// Lifecycle of a stage within a run.
///
/// Displays as `idle`, `starting`, `finished in 0.42s` or `error`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StageStatus {
    #[default]
    Idle,
    Starting,
    Finished(Duration),
    Error,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Idle => f.write_str("idle"),
            StageStatus::Starting => f.write_str("starting"),
            StageStatus::Finished(elapsed) => {
                write!(f, "finished in {:.2}s", elapsed.as_secs_f64())
            }
            StageStatus::Error => f.write_str("error"),
        }
    }
}

/// Failure of the last run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorRecord {
    /// `Error: ` followed by the error message.
    pub message: String,
    /// ISO-8601 UTC time of the failure.
    pub timestamp: String,
    /// Error chain and the backtrace captured when the failure was recorded.
    pub stack: String,
}

impl ErrorRecord {
    pub fn from_error(err: &EngineError) -> Self {
        let backtrace = std::backtrace::Backtrace::force_capture();
        Self {
            message: format!("Error: {err}"),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            stack: format!("{}\n{backtrace}", err.chain()),
        }
    }
}

/// Status of every stage plus the failure of the last run, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    accounts: StageStatus,
    yearly: StageStatus,
    fs: StageStatus,
    error: Option<ErrorRecord>,
}

impl RunState {
    pub fn stage(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Accounts => self.accounts,
            Stage::Yearly => self.yearly,
            Stage::Fs => self.fs,
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        self.error.as_ref()
    }

    pub(crate) fn with_stage(mut self, stage: Stage, status: StageStatus) -> Self {
        match stage {
            Stage::Accounts => self.accounts = status,
            Stage::Yearly => self.yearly = status,
            Stage::Fs => self.fs = status,
        }
        self
    }

    /// Start of a run: the previous failure is forgotten.
    pub(crate) fn cleared(mut self) -> Self {
        self.error = None;
        self
    }

    /// Every stage in `error` and `record` kept.
    pub(crate) fn failed(self, record: ErrorRecord) -> Self {
        let mut state = Stage::ALL
            .into_iter()
            .fold(self, |state, stage| state.with_stage(stage, StageStatus::Error));
        state.error = Some(record);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert_eq!(
            "error".parse::<Stage>().unwrap_err(),
            EngineError::UnknownStage("error".to_string())
        );
        assert!("Accounts".parse::<Stage>().is_err());
    }

    #[test]
    fn status_display() {
        assert_eq!(StageStatus::Idle.to_string(), "idle");
        assert_eq!(StageStatus::Starting.to_string(), "starting");
        assert_eq!(StageStatus::Error.to_string(), "error");
        assert_eq!(
            StageStatus::Finished(Duration::from_millis(1234)).to_string(),
            "finished in 1.23s"
        );
        assert_eq!(
            StageStatus::Finished(Duration::ZERO).to_string(),
            "finished in 0.00s"
        );
    }

    #[test]
    fn new_state_is_idle() {
        let state = RunState::default();
        for stage in Stage::ALL {
            assert_eq!(state.stage(stage), StageStatus::Idle);
        }
        assert!(state.error().is_none());
    }

    #[test]
    fn failure_marks_every_stage() {
        let err = EngineError::Task("boom".to_string());
        let state = RunState::default()
            .with_stage(Stage::Accounts, StageStatus::Finished(Duration::ZERO))
            .failed(ErrorRecord::from_error(&err));

        for stage in Stage::ALL {
            assert_eq!(state.stage(stage), StageStatus::Error);
        }
        let record = state.error().unwrap();
        assert_eq!(record.message, "Error: ledger task failed: boom");
        assert!(record.timestamp.ends_with('Z'));
        assert!(!record.stack.is_empty());

        assert!(state.cleared().error().is_none());
    }
}
