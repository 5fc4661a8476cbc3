//! Liveness endpoint for external uptime monitors.
//!
//! Shares no state with the bot; it keeps answering even when every
//! guild queue is stalled.

use axum::{http::StatusCode, routing::get, Router};
use std::{net::SocketAddr, thread};
use tracing::{error, info};

pub fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(alive))
}

async fn alive() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Bot is alive!")
}

pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("💓 Liveness escuchando en {}", addr);

    axum::serve(listener, router()).await?;

    Ok(())
}

/// Corre el endpoint en su propio hilo con su propio runtime
pub fn spawn(port: u16) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("liveness".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("❌ No se pudo crear el runtime de liveness: {:?}", e);
                    return;
                }
            };

            if let Err(e) = runtime.block_on(serve(port)) {
                error!("❌ Endpoint de liveness terminó: {:?}", e);
            }
        })
}
