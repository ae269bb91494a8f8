//! Documentation of a railway complaint intake service.
//!
//! Passengers submit a PNR, a subject and a photo. The photo goes to a storage
//! bucket, an image-to-text model describes it, and the complaint is kept in
//! Redis under its PNR so it can be looked up later.
//!
//!
//!
//! # General Infrastructure
//! - Single stateless axum server, every request handled on its own
//! - Redis holds complaint records, see [`database`]
//! - Google Cloud Storage holds images, see [`storage`]
//! - Hosted captioning model describes images, see [`caption`]
//! - Clients for all three are built once at startup and shared through [`state::AppState`]
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | `GET` | `/` | liveness |
//! | `POST` | `/submit-complaint` | multipart `pnr`, `subject`, `image` |
//! | `GET` | `/get-complaints/{pnr}` | complaint by PNR |
//! | `GET` | `/admin/pending-complaints` | every complaint still `Pending` |
//! | `PATCH` | `/admin/complaints/{pnr}/status` | JSON `{"newStatus": "..."}` |
//!
//! Errors are JSON `{"error": "..."}`. Upstream failures are reported as a
//! plain 500 with no hint of which step failed; the logs carry the detail.
//!
//!
//!
//! # Notes
//!
//! ## Resubmissions
//! A second submission with the same PNR replaces the first one entirely,
//! including any status an operator set in between.
//!
//! ## Image keys
//! Images are stored under `images/<file name>` so two passengers uploading
//! `photo.jpg` overwrite each other. Set `UNIQUE_IMAGE_KEYS=true` to store
//! under `images/<pnr>-<millis>-<file name>` instead.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run locally against a local Redis.
//! ```sh
//! docker run -d -p 6379:6379 redis:7
//! HUGGING_FACE_API_KEY=hf_... GCS_BUCKET_NAME=my-bucket RUST_LOG=info cargo run --bin madad
//! ```
//!
//! Smoke test a running server.
//! ```sh
//! cargo run -p tester -- submit PNR123 Delay ./photo.jpg
//! cargo run -p tester -- get PNR123
//! ```
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{CONTENT_TYPE, ORIGIN},
    },
    middleware::from_fn,
    routing::{get, patch, post},
};
use signal::ctrl_c;
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod caption;
pub mod complaint;
pub mod config;
pub mod database;
pub mod error;
pub mod fake;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod storage;
pub mod utils;
pub mod workflow;

use config::Config;
use routes::{
    change_status_handler, get_complaints_handler, get_complaints_without_pnr_handler,
    hello_handler, pending_complaints_handler, submit_complaint_handler,
};
use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(hello_handler))
        .route("/submit-complaint", post(submit_complaint_handler))
        .route("/get-complaints", get(get_complaints_without_pnr_handler))
        .route("/get-complaints/", get(get_complaints_without_pnr_handler))
        .route("/get-complaints/{pnr}", get(get_complaints_handler))
        .route("/admin/pending-complaints", get(pending_complaints_handler))
        .route("/admin/complaints/{pnr}/status", patch(change_status_handler))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(from_fn(middleware::request_tracing))
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| warn!("Ignoring invalid CORS origin {origin}: {e}"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ORIGIN])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
