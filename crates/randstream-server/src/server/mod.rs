pub mod config;
pub mod service;
pub mod streaming;
pub mod telemetry;

use core::future::Future;
use service::handler::{AppState, router};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Serves the stream route on `listener` until `shutdown` resolves.
///
/// Peer addresses are attached to every request so the handler can fall back
/// to them when no proxy header is present.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}
