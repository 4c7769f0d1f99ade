use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::Method,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    models::{AnalysisResult, Dataset},
    services::{
        context::render_prompt_context,
        excel::{load_file_from_url, read_workbook},
        stats_cache::StatsCache,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/stats", post(stats_from_rows))
        .route("/stats/xlsx", post(stats_from_workbook))
        .route("/sheets/analyze", post(analyze_sheet))
        .route("/db/query", post(query_database))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct StatsRequest {
    #[serde(default)]
    data: Option<Dataset>,
}

#[derive(Debug, Deserialize)]
pub struct FileInfo {
    #[serde(rename = "type")]
    file_type: String,
    signed_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    files: Vec<FileInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DbQueryRequest {
    sql: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    content_hash: String,
    cached: bool,
    local_stats: Option<Arc<AnalysisResult>>,
    prompt_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sheet_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DbQueryResponse {
    columns: Vec<String>,
    row_count: usize,
    truncated: bool,
    rows: Dataset,
    stats: StatsResponse,
}

async fn stats_from_rows(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StatsRequest>,
) -> Result<Json<StatsResponse>, AppError> {
    let rows = request.data.unwrap_or_default();
    tracing::info!("Profiling {} submitted rows", rows.len());
    let response = profile(state.cache.clone(), rows).await?;
    Ok(Json(response))
}

async fn stats_from_workbook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<StatsResponse>, AppError> {
    if body.is_empty() {
        return Err(AppError::InvalidInput("No file provided".to_string()));
    }
    check_size(body.len(), state.config.max_file_size)?;
    profile_workbook(&state, body).await.map(Json)
}

async fn analyze_sheet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<StatsResponse>, AppError> {
    let start = Instant::now();

    // 1. Validate file type and get URL
    let file_info = request
        .files
        .first()
        .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    tracing::info!(
        "Processing file type: {}, URL length: {}",
        file_info.file_type,
        file_info.signed_url.len()
    );

    if !file_info.file_type.to_lowercase().contains("xlsx") {
        tracing::error!("Unsupported file type: {}", file_info.file_type);
        return Err(AppError::InvalidInput("Only XLSX files are supported".to_string()));
    }

    // 2. Download file from URL
    let download_start = Instant::now();
    let file_data = load_file_from_url(&file_info.signed_url, state.config.max_file_size).await?;
    tracing::info!(
        "File downloaded, size: {}KB, took: {:?}",
        file_data.len() / 1024,
        download_start.elapsed()
    );

    // 3. Read and profile the first sheet
    let response = profile_workbook(&state, file_data).await?;
    tracing::info!("Total processing completed in {:?}", start.elapsed());
    Ok(Json(response))
}

async fn query_database(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DbQueryRequest>,
) -> Result<Json<DbQueryResponse>, AppError> {
    let db = state
        .db
        .clone()
        .ok_or_else(|| AppError::InvalidInput("No database source is configured".to_string()))?;

    let query_start = Instant::now();
    let output = tokio::task::spawn_blocking(move || db.query(&request.sql))
        .await
        .map_err(|e| AppError::Internal(format!("query task failed: {}", e)))??;
    tracing::info!("Query returned {} rows in {:?}", output.rows.len(), query_start.elapsed());

    let stats = profile(state.cache.clone(), output.rows.clone()).await?;
    Ok(Json(DbQueryResponse {
        columns: output.columns,
        row_count: output.rows.len(),
        truncated: output.truncated,
        rows: output.rows,
        stats,
    }))
}

fn check_size(len: usize, max_file_size: usize) -> Result<(), AppError> {
    if len > max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {} bytes, limit is {}",
            len, max_file_size
        )));
    }
    Ok(())
}

async fn profile_workbook(state: &AppState, file_data: Bytes) -> Result<StatsResponse, AppError> {
    let read_start = Instant::now();
    let sheet = tokio::task::spawn_blocking(move || read_workbook(file_data))
        .await
        .map_err(|e| AppError::Internal(format!("workbook task failed: {}", e)))??;
    tracing::info!(
        "Workbook read in {:?}: sheet {} with {} rows",
        read_start.elapsed(),
        sheet.sheet_name,
        sheet.rows.len()
    );

    let mut response = profile(state.cache.clone(), sheet.rows).await?;
    response.sheet_name = Some(sheet.sheet_name);
    Ok(response)
}

/// Profile on the blocking pool; the cache is shared across requests.
async fn profile(cache: StatsCache, rows: Dataset) -> Result<StatsResponse, AppError> {
    let start = Instant::now();
    let analysis = tokio::task::spawn_blocking(move || cache.get_or_compute(&rows))
        .await
        .map_err(|e| AppError::Internal(format!("profiling task failed: {}", e)))??;

    let prompt_context = analysis.result.as_deref().map(render_prompt_context);
    tracing::info!(
        "Stats {} in {:?} (cached: {}, available: {})",
        analysis.content_hash,
        start.elapsed(),
        analysis.cached,
        analysis.result.is_some()
    );

    Ok(StatsResponse {
        content_hash: analysis.content_hash,
        cached: analysis.cached,
        local_stats: analysis.result,
        prompt_context,
        sheet_name: None,
    })
}
