use std::{env, net::SocketAddr, sync::Arc};
use tazita::sync::{HttpKvBackend, SyncBackend, spawn_flush_task};
use tazita::{AppState, resolve_data_dir, router};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let data_dir = resolve_data_dir();
    fs::create_dir_all(&data_dir).await?;

    let backend = match HttpKvBackend::from_env() {
        Some(backend) => Some(Arc::new(backend) as Arc<dyn SyncBackend>),
        None => {
            warn!("SYNC_URL not set, running local-only");
            None
        }
    };

    let (state, sync_rx) = AppState::new(data_dir, backend);
    let flush_task = spawn_flush_task(&state, sync_rx);

    let app = router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping the router closed the mutation channel; the flush task
    // writes anything still pending before it exits.
    flush_task.await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
