use crate::config::RelayConfig;
use crate::signaling::{SignalingService, ws_handler};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct Health {
    rooms: usize,
    connections: usize,
}

async fn health(State(service): State<SignalingService>) -> Json<Health> {
    Json(Health {
        rooms: service.rooms().room_count(),
        connections: service.connection_count(),
    })
}

/// `GET /ws` upgrades to the signaling channel, `GET /health` reports registry size.
pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(service)
}

/// Bind and serve the relay until Ctrl-C.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let service = SignalingService::new(&config);
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Signaling relay listening on ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("Relay server failed")?;

    Ok(())
}
