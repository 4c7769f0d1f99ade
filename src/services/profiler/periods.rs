use indexmap::IndexSet;
use tracing::debug;

use super::calendar::{calendar_day, is_month_axis, is_quarter_axis, month_index, parse_timestamp};
use super::classify::column_values;
use super::normalize::median;
use crate::models::{
    CellValue, ColumnInfo, ColumnType, DetectedPeriod, PeriodInfo, PeriodLabels, PeriodType, Row,
};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

struct Candidate {
    column: String,
    period_type: PeriodType,
    periods: Vec<String>,
    labels: PeriodLabels,
}

/// Find the dataset's temporal axis among date and categorical columns.
///
/// Every candidate axis is recorded in `all_detected`; the one with the most
/// periods wins, earlier candidates winning ties.
pub fn detect_periods(rows: &[Row], columns: &[ColumnInfo]) -> PeriodInfo {
    let date_columns = columns.iter().filter(|c| c.column_type == ColumnType::Date);
    let categorical_columns = columns.iter().filter(|c| c.column_type == ColumnType::Categorical);

    let mut candidates: Vec<Candidate> = date_columns
        .chain(categorical_columns)
        .filter_map(|column| detect_axis(rows, column))
        .collect();

    if candidates.is_empty() {
        debug!("No period axis detected");
        return PeriodInfo::none();
    }

    // stable: ties keep candidate order
    candidates.sort_by(|a, b| b.periods.len().cmp(&a.periods.len()));
    let all_detected = candidates
        .iter()
        .map(|c| DetectedPeriod {
            column: c.column.clone(),
            period_type: c.period_type,
            period_count: c.periods.len(),
        })
        .collect();

    let best = candidates.swap_remove(0);
    debug!(
        "Period axis {} ({}) with {} periods",
        best.column,
        best.period_type,
        best.periods.len()
    );

    PeriodInfo {
        has_periods: true,
        can_compare: best.periods.len() >= 2,
        period_column: Some(best.column),
        period_type: Some(best.period_type),
        periods: best.periods,
        all_detected,
        labels: best.labels,
    }
}

fn detect_axis(rows: &[Row], column: &ColumnInfo) -> Option<Candidate> {
    let values = column_values(rows, &column.name);
    if values.len() < 2 {
        return None;
    }

    let labels: Vec<String> = values.iter().map(|v| v.label()).collect();

    if is_month_axis(&labels) {
        let mut periods: Vec<String> = labels.into_iter().collect::<IndexSet<_>>().into_iter().collect();
        periods.sort_by_key(|label| month_index(label).unwrap_or(99));
        return Some(Candidate {
            column: column.name.clone(),
            period_type: PeriodType::Monthly,
            periods,
            labels: PeriodLabels::Lowercased,
        });
    }

    if is_quarter_axis(&labels) {
        let mut periods: Vec<String> = labels.into_iter().collect::<IndexSet<_>>().into_iter().collect();
        periods.sort();
        return Some(Candidate {
            column: column.name.clone(),
            period_type: PeriodType::Quarterly,
            periods,
            labels: PeriodLabels::Lowercased,
        });
    }

    if column.column_type == ColumnType::Date {
        return timestamp_axis(&column.name, &values);
    }

    None
}

fn timestamp_axis(name: &str, values: &[&CellValue]) -> Option<Candidate> {
    let mut timestamps: Vec<_> = values
        .iter()
        .filter_map(|v| parse_timestamp(&v.to_string()))
        .collect();
    if timestamps.len() < 2 {
        return None;
    }
    timestamps.sort();
    timestamps.dedup();

    let mut gaps: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / MILLIS_PER_DAY)
        .collect();
    gaps.sort_by(f64::total_cmp);

    let mut periods: Vec<String> = timestamps.iter().map(calendar_day).collect();
    periods.dedup();

    Some(Candidate {
        column: name.to_string(),
        period_type: granularity(median(&gaps)),
        periods,
        labels: PeriodLabels::CalendarDay,
    })
}

/// Classify the median gap between consecutive dates, in days.
/// Without any gap the chain falls through to yearly.
fn granularity(median_gap_days: Option<f64>) -> PeriodType {
    match median_gap_days {
        Some(days) if days <= 1.5 => PeriodType::Daily,
        Some(days) if days <= 8.0 => PeriodType::Weekly,
        Some(days) if days <= 35.0 => PeriodType::Monthly,
        Some(days) if days <= 100.0 => PeriodType::Quarterly,
        _ => PeriodType::Yearly,
    }
}

/// The period label a row's period-column cell falls into.
pub(crate) fn period_key(labels: PeriodLabels, cell: &CellValue) -> Option<String> {
    if cell.is_empty() {
        return None;
    }
    match labels {
        PeriodLabels::Lowercased => Some(cell.label()),
        PeriodLabels::CalendarDay => parse_timestamp(&cell.to_string()).map(|ts| calendar_day(&ts)),
    }
}
