//! Report API endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use engine::Stage;

use crate::{
    ServerError,
    server::ServerState,
    types::reports::{Balance, ErrorRecord, ReportFile, RunState, RunSummary, StageState},
};

fn error_view(record: &engine::ErrorRecord) -> ErrorRecord {
    ErrorRecord {
        message: record.message.clone(),
        timestamp: record.timestamp.clone(),
        stack: record.stack.clone(),
    }
}

fn state_view(state: &engine::RunState) -> RunState {
    RunState {
        accounts: state.stage(Stage::Accounts).to_string(),
        yearly: state.stage(Stage::Yearly).to_string(),
        fs: state.stage(Stage::Fs).to_string(),
        error: state.error().map(error_view),
    }
}

fn summary_view(summary: &engine::RunSummary, state: &engine::RunState) -> RunSummary {
    let reports = [
        (Stage::Accounts, &summary.accounts.output),
        (Stage::Yearly, &summary.yearly.output),
        (Stage::Fs, &summary.statement.output),
    ]
    .into_iter()
    .map(|(stage, path)| ReportFile {
        stage: stage.to_string(),
        path: path.display().to_string(),
    })
    .collect();

    RunSummary {
        reports,
        accounts: summary
            .accounts
            .balances
            .iter()
            .map(|(name, amount)| Balance {
                name: name.to_string(),
                amount: amount.to_string(),
            })
            .collect(),
        yearly: summary
            .yearly
            .cash_by_year
            .iter()
            .map(|(year, amount)| Balance {
                name: year.clone(),
                amount: amount.to_string(),
            })
            .collect(),
        net_income: summary.statement.totals.net_income.to_string(),
        ledger_reads: summary.cache.misses,
        state: state_view(state),
    }
}

/// Run every report stage
pub async fn run(State(state): State<ServerState>) -> Result<Json<RunSummary>, ServerError> {
    match state.engine.run_all().await {
        Ok(summary) => {
            let run_state = state.engine.state().await;
            Ok(Json(summary_view(&summary, &run_state)))
        }
        Err(err) => {
            let message = state
                .engine
                .error_record()
                .await
                .map_or_else(|| format!("Error: {err}"), |record| record.message);
            Err(ServerError::Run(message))
        }
    }
}

/// Status of every stage and the last failure
pub async fn get_state(State(state): State<ServerState>) -> Json<RunState> {
    Json(state_view(&state.engine.state().await))
}

pub async fn get_stage_state(
    State(state): State<ServerState>,
    Path(stage): Path<String>,
) -> Result<Json<StageState>, ServerError> {
    let stage: Stage = stage.parse()?;
    let status = state.engine.stage_state(stage).await;
    Ok(Json(StageState {
        stage: stage.to_string(),
        status: status.to_string(),
    }))
}

pub async fn get_error(State(state): State<ServerState>) -> Json<Option<ErrorRecord>> {
    Json(state.engine.error_record().await.as_ref().map(error_view))
}
