//! mediascribe-gateway: HTTP front end for media-to-text conversion.
//!
//! Provides:
//! - POST /api/image-to-text, /api/audio-to-text, /api/video-to-text
//! - GET /health
//! - Permissive CORS, request tracing and `x-request-id` tagging

pub mod error;
pub mod handlers;
pub mod request_id;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};

use mediascribe_config::MediascribeConfig;
use mediascribe_media::{GenerativeProvider, MediaConverter};
use mediascribe_types::MediaKind;

pub use error::ApiError;
pub use request_id::REQUEST_ID_HEADER;

/// Shared gateway state, built once at startup and read-only afterwards.
pub struct GatewayState {
    pub converter: MediaConverter,
}

impl GatewayState {
    pub fn new(converter: MediaConverter) -> Self {
        Self { converter }
    }
}

/// Build the axum router over `state`.
pub fn build_router(state: Arc<GatewayState>, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route(MediaKind::Image.route(), post(handlers::image_to_text))
        .route(MediaKind::Audio.route(), post(handlers::audio_to_text))
        .route(MediaKind::Video.route(), post(handlers::video_to_text))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

/// Start the gateway.
///
/// The configuration is validated before anything is bound, so a missing API
/// key stops startup here.
pub async fn start_gateway(
    config: MediascribeConfig,
    provider: Arc<dyn GenerativeProvider>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    let converter = MediaConverter::from_config(provider, &config);
    let provider_id = converter.provider_id().to_string();
    let state = Arc::new(GatewayState::new(converter));
    let app = build_router(state, config.gateway.body_limit_bytes());

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Gateway listening on {addr}");
    info!("  Provider:  {provider_id} ({})", config.provider.base_url);
    for kind in MediaKind::ALL {
        info!(
            "  {:<9}  POST http://{addr}{} -> {}",
            format!("{kind}:"),
            kind.route(),
            config.provider.model_for(kind)
        );
    }
    info!("  Health:    http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// GET /health, simple HTTP health check.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
