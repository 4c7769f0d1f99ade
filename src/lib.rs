use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

pub use services::profiler::compute_local_stats;

use error::AppError;
use services::{db_source::DbSource, stats_cache::StatsCache};

// Application state
pub struct AppState {
    pub config: config::Config,
    pub cache: StatsCache,
    pub db: Option<Arc<DbSource>>,
}

impl AppState {
    pub fn new(config: config::Config) -> Result<Self, AppError> {
        let db = match &config.sqlite_path {
            Some(path) => Some(Arc::new(DbSource::open(path, config.max_query_rows)?)),
            None => None,
        };

        Ok(Self {
            cache: StatsCache::new(config.cache_capacity),
            db,
            config,
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_file_size;

    Router::new()
        .merge(routes::routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
