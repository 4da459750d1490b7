//! pdfedit Server
//!
//! An HTTP backend for editing PDF documents in place. Provides REST API
//! endpoints for:
//!
//! - Text layout extraction (`/get-pdf-text`) with per-span geometry
//! - Coordinate patching (`/edit-pdf`): white out a rectangle, draw new text
//! - Page tools: merge, split, remove, rotate, reorder, crop
//! - Compression, watermarking, metadata editing and plain-text export
//!
//! ## Architecture
//!
//! Uploaded documents for the editor live in an in-memory session store
//! keyed by a random token. Each client works on its own session, so
//! concurrent editors never see each other's documents. A background task
//! sweeps expired sessions.
//!
//! - Rate limiting via tower-governor
//! - Request tracing via tower-http
//! - All PDF work runs on the blocking pool

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod error;
mod session;

use api::{
    handle_compress, handle_crop, handle_delete_session, handle_edit_metadata, handle_edit_pdf,
    handle_get_pdf_text, handle_get_session, handle_health, handle_merge, handle_pdf_to_text,
    handle_remove_pages, handle_reorder, handle_rotate, handle_split, handle_watermark,
};
use config::Args;
use session::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
}

/// All routes with body limit, tracing and CORS; rate limiting is added in `main`.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Editor
        .route("/get-pdf-text", post(handle_get_pdf_text))
        .route("/edit-pdf", post(handle_edit_pdf))
        .route(
            "/sessions/:id",
            get(handle_get_session).delete(handle_delete_session),
        )
        // Page tools
        .route("/merge", post(handle_merge))
        .route("/split", post(handle_split))
        .route("/remove-pages", post(handle_remove_pages))
        .route("/rotate-pdf", post(handle_rotate))
        .route("/reorder-pdf", post(handle_reorder))
        .route("/crop-pdf", post(handle_crop))
        .route("/compress", post(handle_compress))
        .route("/watermark", post(handle_watermark))
        .route("/edit-metadata", post(handle_edit_metadata))
        .route("/pdf-to-text", post(handle_pdf_to_text))
        // Apply middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pdfedit server on {}:{}", args.host, args.port);

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit.saturating_mul(2))
            .finish()
            .context("Failed to create rate limiter config")?,
    );

    // Create shared state
    let sessions = SessionStore::new(args.session_ttl(), args.max_sessions);
    let _sweeper = sessions.spawn_sweeper(args.sweep_interval());
    let state = AppState { sessions };

    let app = build_router(state, args.max_upload_bytes()).layer(GovernorLayer {
        config: governor_conf,
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!(
        "Sessions: ttl={}s, sweep every {}s, max={}",
        args.session_ttl_secs,
        args.sweep_interval_secs,
        if args.max_sessions == 0 {
            "unlimited".to_string()
        } else {
            args.max_sessions.to_string()
        }
    );
    info!("Max upload: {} MB", args.max_upload_mb);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
