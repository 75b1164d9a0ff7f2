pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod state;
pub mod status;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::timeout::TimeoutLayer;

use stargazer_core::RunExit;

use crate::app::Stargazer;
use crate::config::{StargazerConfig, WatchPlan};
use crate::error::ServerError;
use crate::state::AppState;

/// Requests that take longer than this are answered with 408.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the status router.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status::get_status))
        .route("/health", get(health::health_check))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Run the watch loop and the status server until the loop ends or the
/// process is interrupted.
pub async fn run(config: StargazerConfig, plan: WatchPlan) -> Result<RunExit, ServerError> {
    let http = app::http_client()?;
    let stargazer = Arc::new(Stargazer::from_config(&config, plan, http)?);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve(listener, stargazer).await
}

/// Like [`run`], on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    stargazer: Arc<Stargazer>,
) -> Result<RunExit, ServerError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Status server listening");
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let router = build_app(AppState::new(stargazer.status_source()));
    let server = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .into_future(),
    );

    let watch = stargazer.run();
    tokio::pin!(watch);
    let exit = tokio::select! {
        exit = &mut watch => exit,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping watcher");
            stargazer.stop().await;
            watch.await
        },
    };

    let _ = shutdown_tx.send(());
    match server.await {
        Ok(Ok(())) => tracing::info!("Status server stopped"),
        Ok(Err(e)) => return Err(ServerError::Serve(e)),
        Err(e) => tracing::warn!(error = %e, "Status server task failed"),
    }

    let exit = exit?;
    tracing::info!(?exit, "Watcher finished");
    Ok(exit)
}
