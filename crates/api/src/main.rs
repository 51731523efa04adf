use anyhow::Context;

use partstock_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    partstock_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = partstock_api::app::build_services(&config)
        .await
        .context("failed to initialize stores")?;
    let app = partstock_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
