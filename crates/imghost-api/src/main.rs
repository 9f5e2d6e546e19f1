use imghost_api::setup;
use imghost_core::Config;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = setup::initialize_app(config.clone()).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = setup::start_background_tasks(&state, shutdown_rx);

    setup::server::start_server(&config, router, shutdown_tx).await?;

    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
