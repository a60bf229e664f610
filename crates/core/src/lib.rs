pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod relay;
pub mod upload;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

//
// Re-export
//
pub use api::{UploadResponse, health, log_request_errors, upload, upload_page};
pub use app_state::AppState;
pub use config::Config;
pub use error::{ErrorDetail, ErrorResponse, UploadError};
pub use relay::{RelayClient, RelayPayload, RelayResult};
pub use upload::{ParsedUpload, StoredFile, UploadedFile};

/// Build the application router around an already initialised state
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(upload_page))
        .route("/upload-test", get(upload_page))
        .route("/health", get(health))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(axum::middleware::from_fn(api::log_request_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(state))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config)?;
    let app = router(state, config.max_upload_bytes());

    let addr = format!("0.0.0.0:{}", config.listen_on_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
