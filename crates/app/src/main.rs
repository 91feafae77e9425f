use error::Result;

mod error;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledger_reports={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let reports = settings.reports;
    let engine = engine::Engine::builder()
        .source_dir(reports.source_dir)
        .output_dir(reports.output_dir)
        .taxonomy(reports.taxonomy.unwrap_or_default())
        .build();

    if let Some(server) = settings.server {
        tracing::info!("Found server settings...");
        let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
        let addr = format!("{}:{}", bind, server.port);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        server::run_with_listener(engine, listener).await?;
        return Ok(());
    }

    tracing::info!(
        "Generating reports from {} into {}",
        engine.source_dir().display(),
        engine.output_dir().display()
    );
    let summary = engine.run_all().await?;
    for output in [
        &summary.accounts.output,
        &summary.yearly.output,
        &summary.statement.output,
    ] {
        tracing::info!("wrote {}", output.display());
    }

    Ok(())
}
