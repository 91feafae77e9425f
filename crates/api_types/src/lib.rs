use serde::{Deserialize, Serialize};

pub mod reports {
    use super::*;

    /// Failure of the last report run.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ErrorRecord {
        pub message: String,
        /// ISO-8601 UTC timestamp.
        pub timestamp: String,
        pub stack: String,
    }

    /// Status of one stage (`accounts`, `yearly` or `fs`).
    ///
    /// `status` is `idle`, `starting`, `finished in <seconds>s` or `error`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct StageState {
        pub stage: String,
        pub status: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RunState {
        pub accounts: String,
        pub yearly: String,
        pub fs: String,
        pub error: Option<ErrorRecord>,
    }

    /// A report file written by a stage.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ReportFile {
        pub stage: String,
        pub path: String,
    }

    /// Amounts are rendered with two decimals, as in the report files.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Balance {
        pub name: String,
        pub amount: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RunSummary {
        pub reports: Vec<ReportFile>,
        pub accounts: Vec<Balance>,
        pub yearly: Vec<Balance>,
        pub net_income: String,
        /// Ledger files read from storage during the run.
        pub ledger_reads: usize,
        pub state: RunState,
    }
}
