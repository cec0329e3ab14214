//! Upload form and banner download over HTTP.

pub mod routes;

use crate::config::cli::LocalStorage;
use crate::core::engine::BannerEngine;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BannerEngine<LocalStorage>>,
    pub upload_dir: PathBuf,
    /// Held from saving the upload until the archive is read back; there is
    /// a single output archive.
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(engine: BannerEngine<LocalStorage>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine: Arc::new(engine),
            upload_dir: upload_dir.into(),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/",
            get(routes::upload_page).post(routes::upload_handler),
        )
        .route("/health", get(routes::health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
