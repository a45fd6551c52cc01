use anyhow::{Context, Result};
use pagewash::{app_state::AppState, config::Config, gateway, telemetry};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    telemetry::init(config.log_format());

    let state = AppState::from_config(&config)
        .await
        .context("failed to start rendering session")?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(gateway::shutdown_on(
        tokio::signal::ctrl_c(),
        shutdown.clone(),
    ));

    let session = state.session.clone();
    gateway::serve(listener, state, shutdown).await?;

    if let Err(e) = session.shutdown().await {
        warn!(error = %e, "rendering session did not shut down cleanly");
    }
    Ok(())
}
