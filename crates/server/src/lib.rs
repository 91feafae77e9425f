use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{router, run_with_listener};

mod reports;
mod server;

pub mod types {
    pub mod reports {
        pub use api_types::reports::{
            Balance, ErrorRecord, ReportFile, RunState, RunSummary, StageState,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    /// A report run failed; carries the recorded message.
    Run(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::UnknownStage(_) => StatusCode::NOT_FOUND,
        EngineError::ReadDir { .. }
        | EngineError::ReadLedger { .. }
        | EngineError::WriteReport { .. }
        | EngineError::Csv(_)
        | EngineError::Task(_)
        | EngineError::AmountOutOfRange(_)
        | EngineError::Overflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), err.to_string()),
            ServerError::Run(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
