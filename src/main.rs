use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use code_redeemer::api::HttpApiClient;
use code_redeemer::config::Config;
use code_redeemer::persistence::FileStore;
use code_redeemer::server::{AppState, build_router};
use code_redeemer::status::StatusLog;
use code_redeemer::upload::UploadDriver;
use code_redeemer::worker::{IntakeWorker, WorkerHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "code_redeemer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("reading configuration")?;
    tracing::info!(
        state_file = %config.state_file.display(),
        master_server = %config.master_server,
        "Starting code redeemer"
    );

    let store = Arc::new(FileStore::new(&config.state_file));
    let api = Arc::new(
        HttpApiClient::new(&config.master_server, config.request_timeout)
            .context("building HTTP client")?,
    );
    let status = StatusLog::new();
    let status_sink = Arc::new(status.clone());

    let driver = UploadDriver::new(Arc::clone(&store), api, Arc::clone(&status_sink));
    let worker = IntakeWorker::new(store, driver, status_sink);

    let shutdown = CancellationToken::new();
    let (handle, worker_task) = WorkerHandle::spawn(worker, shutdown.clone());

    let app = build_router(AppState::new(handle, status));
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!("listening on {}", config.listen_addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
            server_shutdown.cancel();
        })
        .await
        .context("serving HTTP")?;

    shutdown.cancel();
    worker_task.await.context("joining intake worker")?;
    Ok(())
}
