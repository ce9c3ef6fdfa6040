use anyhow::Context;

use softgate_api::{app::build_app, config::AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    softgate_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        runner = config.runner.program(),
        grace = ?config.runner.terminate_grace(),
        "command runner configured"
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, build_app(config)).await?;
    Ok(())
}
