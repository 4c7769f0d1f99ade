//! Local statistical profiling of tabular datasets.
//!
//! [`compute_local_stats`] runs four stages in sequence: column classification,
//! period detection, per-column statistics and chart recommendation. The
//! result is all-or-nothing: any stage failure yields `None`.

pub mod calendar;
pub mod charts;
pub mod classify;
pub mod normalize;
pub mod periods;
pub mod stats;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, warn};

pub use charts::suggest_charts;
pub use classify::classify_columns;
pub use periods::detect_periods;
pub use stats::compute_stats;

use crate::error::ProfileError;
use crate::models::{AnalysisResult, DatasetAnalysis, Row, LOCAL_SOURCE};

/// Profile a dataset. Returns `None` for empty input and whenever the
/// analysis could not be completed; failures are logged, never raised.
pub fn compute_local_stats(rows: &[Row]) -> Option<AnalysisResult> {
    if rows.is_empty() {
        return None;
    }

    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyse(rows)))
        .unwrap_or_else(|payload| Err(ProfileError::Panicked(panic_message(payload))));

    match outcome {
        Ok(analysis) => {
            debug!(
                "Profiled {} rows x {} columns in {:?}",
                rows.len(),
                analysis.columns.len(),
                start.elapsed()
            );
            Some(AnalysisResult {
                analysis,
                row_count: rows.len(),
                source: LOCAL_SOURCE.to_string(),
            })
        }
        Err(e) => {
            warn!("Local stats unavailable: {}", e);
            None
        }
    }
}

fn analyse(rows: &[Row]) -> Result<DatasetAnalysis, ProfileError> {
    let columns = classify_columns(rows);
    let periods = detect_periods(rows, &columns);
    let stats = compute_stats(rows, &columns, &periods)?;
    let chart_recommendations = suggest_charts(&columns, &periods, &stats);

    Ok(DatasetAnalysis {
        columns,
        periods,
        stats,
        chart_recommendations,
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
