use std::sync::Arc;

use moka::sync::Cache;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::profiler::compute_local_stats;
use crate::error::AppError;
use crate::models::{AnalysisResult, Row};

/// Lowercase hex SHA-256 of the dataset's JSON serialization.
pub fn content_hash(rows: &[Row]) -> Result<String, AppError> {
    let bytes = serde_json::to_vec(rows)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub content_hash: String,
    pub result: Option<Arc<AnalysisResult>>,
    pub cached: bool,
}

/// Analyses keyed by dataset content. `None` outcomes are cached as well;
/// profiling the same rows again would fail the same way.
#[derive(Clone)]
pub struct StatsCache {
    inner: Cache<String, Option<Arc<AnalysisResult>>>,
}

impl StatsCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    pub fn get_or_compute(&self, rows: &[Row]) -> Result<CachedAnalysis, AppError> {
        let content_hash = content_hash(rows)?;
        let entry = self
            .inner
            .entry(content_hash.clone())
            .or_insert_with(|| compute_local_stats(rows).map(Arc::new));

        let cached = !entry.is_fresh();
        debug!("Stats for {} (cached: {})", content_hash, cached);
        Ok(CachedAnalysis {
            content_hash,
            result: entry.into_value(),
            cached,
        })
    }
}
