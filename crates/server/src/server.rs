use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::reports;
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Routes exposing the report engine.
pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };
    Router::new()
        .route("/reports/run", post(reports::run))
        .route("/reports/state", get(reports::get_state))
        .route("/reports/state/{stage}", get(reports::get_stage_state))
        .route("/reports/error", get(reports::get_error))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine))).await
}
