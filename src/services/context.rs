//! Plain-text rendering of an analysis for a generation prompt.
//!
//! Only figures present in the [`AnalysisResult`] are printed.

use std::fmt::Write;

use crate::models::{AnalysisResult, ColumnStats};

const TOP_CATEGORIES: usize = 5;

pub fn render_prompt_context(result: &AnalysisResult) -> String {
    let analysis = &result.analysis;
    let mut out = String::new();

    // writing to a String is infallible
    let _ = writeln!(out, "AUTHORITATIVE STATISTICS (computed from {} rows)", result.row_count);
    let _ = writeln!(out, "Use these figures verbatim. Do not invent numbers.");

    let _ = writeln!(out, "\nColumns:");
    for column in &analysis.columns {
        let _ = writeln!(
            out,
            "- {} ({}, {} empty of {})",
            column.name, column.column_type, column.null_count, column.total_count
        );
    }

    let periods = &analysis.periods;
    match (&periods.period_column, periods.period_type) {
        (Some(column), Some(period_type)) if periods.has_periods => {
            let _ = writeln!(
                out,
                "\nTime axis: {} ({}), periods in order: {}",
                column,
                period_type,
                periods.periods.join(", ")
            );
            if !periods.can_compare {
                let _ = writeln!(out, "Only one period: do not compute period-over-period changes.");
            }
        }
        _ => {
            let _ = writeln!(
                out,
                "\nNo time axis detected: do not compute or mention period-over-period variations."
            );
        }
    }

    let _ = writeln!(out, "\nStatistics:");
    for (name, stats) in &analysis.stats {
        match stats {
            ColumnStats::Numeric(s) => {
                let _ = writeln!(
                    out,
                    "- {}: sum {}, mean {}, min {}, max {}, median {} ({} values)",
                    name, s.sum, s.mean, s.min, s.max, s.median, s.count
                );
                if let Some(series) = &s.period_values {
                    let values: Vec<String> =
                        series.iter().map(|p| format!("{}={}", p.period, p.value)).collect();
                    let _ = writeln!(out, "  per period: {}", values.join(", "));
                }
                if let Some(v) = &s.variation {
                    let _ = writeln!(
                        out,
                        "  change {} -> {}: {}%",
                        v.first_period, v.last_period, v.change_percent
                    );
                }
            }
            ColumnStats::Unusable { .. } => {
                let _ = writeln!(out, "- {}: no numeric values", name);
            }
            ColumnStats::Categorical(s) => {
                let top: Vec<String> = s
                    .value_counts
                    .iter()
                    .take(TOP_CATEGORIES)
                    .map(|v| format!("{} ({})", v.value, v.count))
                    .collect();
                let _ = writeln!(
                    out,
                    "- {}: {} distinct, top: {}",
                    name,
                    s.unique_count,
                    top.join(", ")
                );
            }
            ColumnStats::Date(s) => {
                let _ = writeln!(out, "- {}: {} distinct dates", name, s.unique_count);
            }
        }
    }

    if !analysis.chart_recommendations.is_empty() {
        let _ = writeln!(out, "\nSuggested charts:");
        for chart in &analysis.chart_recommendations {
            let _ = writeln!(out, "- {}: {} ({})", chart.chart_type, chart.title, chart.reason);
        }
    }

    out
}
