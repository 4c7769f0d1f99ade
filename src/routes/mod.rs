use std::sync::Arc;

use axum::{routing::get, Router};

use crate::AppState;

pub mod stats;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .merge(stats::routes())
}

async fn health_check() -> &'static str {
    "OK"
}
