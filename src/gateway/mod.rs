//! HTTP and WebSocket front of the extraction service. Every route is a
//! thin framing over [`AppState::extract`].

pub mod dtos;
pub mod handlers;

use axum::{Router, routing::get};
use std::future::Future;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    compression::{CompressionLayer, CompressionLevel, predicate::SizeAbove},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::health::{HealthResponse, health_check};
use dtos::{ErrorResponse, ScrapeRequest, ScrapeResponse};

/// Responses smaller than this go out uncompressed.
const COMPRESS_ABOVE_BYTES: u16 = 1024;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::page, handlers::scrape, crate::health::health_check),
    components(schemas(ScrapeRequest, ScrapeResponse, ErrorResponse, HealthResponse)),
    tags(
        (name = "gateway", description = "Sanitized page delivery"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    let compression = CompressionLayer::new()
        .br(true)
        .gzip(true)
        .quality(CompressionLevel::Precise(4))
        .compress_when(SizeAbove::new(COMPRESS_ABOVE_BYTES));

    Router::new()
        .route("/", get(handlers::page))
        .route("/scrape/{*url}", get(handlers::scrape))
        .route("/ws", get(handlers::ws))
        .route("/healthz", get(health_check))
        .route("/openapi.json", get(handlers::openapi))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(compression),
        )
        .with_state(state)
}

/// Serve until `shutdown` is cancelled, letting in-flight requests finish.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "gateway listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Cancel `shutdown` once `signal` fires. A signal listener that fails to
/// install leaves the token alone; the process then has to be stopped.
pub async fn shutdown_on<F>(signal: F, shutdown: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("shutdown requested");
            shutdown.cancel();
        }
        Err(e) => warn!(error = %e, "could not listen for ctrl-c; stop the process to shut down"),
    }
}
