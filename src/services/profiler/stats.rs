use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;

use super::classify::column_values;
use super::normalize::{clean_numeric, median, quantile, round2, stddev};
use super::periods::period_key;
use crate::error::ProfileError;
use crate::models::{
    CategoricalStats, ColumnInfo, ColumnStats, ColumnType, DateStats, NumericStats, PeriodInfo,
    PeriodValue, Quartiles, Row, ValueCount, Variation,
};

const TOP_VALUES: usize = 15;
const DATE_SAMPLE: usize = 10;
pub const NO_NUMERIC_VALUES: &str = "no numeric values";

/// Per-column statistics keyed by column name, in column order.
/// Text columns get no entry.
pub fn compute_stats(
    rows: &[Row],
    columns: &[ColumnInfo],
    periods: &PeriodInfo,
) -> Result<IndexMap<String, ColumnStats>, ProfileError> {
    let row_periods = assign_periods(rows, periods);

    let entries: Vec<(String, Option<ColumnStats>)> = columns
        .par_iter()
        .map(|column| -> Result<_, ProfileError> {
            let stats = match column.column_type {
                t if t.is_numeric() => Some(numeric_stats(rows, column, periods, &row_periods)?),
                ColumnType::Categorical => Some(categorical_stats(rows, column)),
                ColumnType::Date => Some(date_stats(rows, column)),
                _ => None,
            };
            Ok((column.name.clone(), stats))
        })
        .collect::<Result<_, ProfileError>>()?;

    Ok(entries
        .into_iter()
        .filter_map(|(name, stats)| stats.map(|s| (name, s)))
        .collect())
}

/// Index into `periods.periods` for every row, computed once for all columns.
fn assign_periods(rows: &[Row], periods: &PeriodInfo) -> Vec<Option<usize>> {
    let Some(period_column) = periods.period_column.as_deref().filter(|_| periods.has_periods) else {
        return vec![None; rows.len()];
    };
    let index: HashMap<&str, usize> = periods
        .periods
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();

    rows.iter()
        .map(|row| {
            let key = period_key(periods.labels, row.get(period_column)?)?;
            index.get(key.as_str()).copied()
        })
        .collect()
}

fn numeric_stats(
    rows: &[Row],
    column: &ColumnInfo,
    periods: &PeriodInfo,
    row_periods: &[Option<usize>],
) -> Result<ColumnStats, ProfileError> {
    let values: Vec<f64> = column_values(rows, &column.name)
        .into_iter()
        .filter_map(clean_numeric)
        .collect();
    if values.is_empty() {
        return Ok(ColumnStats::Unusable {
            column_type: column.column_type,
            error: NO_NUMERIC_VALUES.to_string(),
        });
    }

    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);

    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;
    let deviation = stddev(&values, mean);

    // sorted is non-empty, so every order statistic exists
    let at = |q: f64| quantile(&sorted, q).map(round2).unwrap_or_default();

    let period_values = periods
        .has_periods
        .then(|| period_series(rows, &column.name, periods, row_periods));
    let variation = period_values
        .as_deref()
        .filter(|_| periods.can_compare)
        .and_then(first_last_variation);

    let stats = NumericStats {
        column_type: column.column_type,
        min: round2(sorted[0]),
        max: round2(sorted[count - 1]),
        mean: round2(mean),
        median: median(&sorted).map(round2).unwrap_or_default(),
        sum: round2(sum),
        stddev: round2(deviation),
        count,
        quartiles: Quartiles {
            q1: at(0.25),
            q2: at(0.5),
            q3: at(0.75),
        },
        period_values,
        variation,
    };

    // rounding scales by 100, so values near f64::MAX overflow only after it
    if !all_finite(&stats) {
        return Err(ProfileError::NonFiniteAggregate {
            column: column.name.clone(),
        });
    }
    Ok(ColumnStats::Numeric(stats))
}

fn all_finite(stats: &NumericStats) -> bool {
    let scalars = [
        stats.min,
        stats.max,
        stats.mean,
        stats.median,
        stats.sum,
        stats.stddev,
        stats.quartiles.q1,
        stats.quartiles.q2,
        stats.quartiles.q3,
    ];
    let series = stats.period_values.iter().flatten().map(|p| p.value);
    let change = stats
        .variation
        .iter()
        .flat_map(|v| [v.first_value, v.last_value, v.change_percent]);

    scalars.into_iter().chain(series).chain(change).all(f64::is_finite)
}

/// Sum of the column per detected period, in period order.
fn period_series(
    rows: &[Row],
    name: &str,
    periods: &PeriodInfo,
    row_periods: &[Option<usize>],
) -> Vec<PeriodValue> {
    let mut totals = vec![0.0; periods.periods.len()];
    for (row, period) in rows.iter().zip(row_periods) {
        let (Some(period), Some(value)) = (period, row.get(name).and_then(clean_numeric)) else {
            continue;
        };
        totals[*period] += value;
    }

    periods
        .periods
        .iter()
        .zip(totals)
        .map(|(period, total)| PeriodValue {
            period: period.clone(),
            value: round2(total),
        })
        .collect()
}

/// First-vs-last change; absent when the first period's total is zero.
fn first_last_variation(series: &[PeriodValue]) -> Option<Variation> {
    if series.len() < 2 {
        return None;
    }
    let first = series.first()?;
    let last = series.last()?;
    if first.value == 0.0 {
        return None;
    }

    Some(Variation {
        first_period: first.period.clone(),
        last_period: last.period.clone(),
        first_value: first.value,
        last_value: last.value,
        change_percent: round2((last.value - first.value) / first.value.abs() * 100.0),
    })
}

fn categorical_stats(rows: &[Row], column: &ColumnInfo) -> ColumnStats {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for value in column_values(rows, &column.name) {
        *counts.entry(value.to_string()).or_default() += 1;
    }
    let unique_count = counts.len();

    let mut ranked: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_VALUES);

    let (top_value, top_count) = ranked
        .first()
        .map_or((None, 0), |top| (Some(top.value.clone()), top.count));

    ColumnStats::Categorical(CategoricalStats {
        column_type: ColumnType::Categorical,
        unique_count,
        top_value,
        top_count,
        value_counts: ranked,
    })
}

fn date_stats(rows: &[Row], column: &ColumnInfo) -> ColumnStats {
    let distinct: IndexSet<String> = column_values(rows, &column.name)
        .into_iter()
        .map(|v| v.to_string())
        .collect();

    ColumnStats::Date(DateStats {
        column_type: ColumnType::Date,
        unique_count: distinct.len(),
        sample: distinct.into_iter().take(DATE_SAMPLE).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, PeriodLabels, PeriodType};
    use crate::services::profiler::classify::classify_columns;
    use crate::services::profiler::periods::detect_periods;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn analyse(rows: &[Row]) -> (PeriodInfo, IndexMap<String, ColumnStats>) {
        let columns = classify_columns(rows);
        let periods = detect_periods(rows, &columns);
        let stats = compute_stats(rows, &columns, &periods).unwrap();
        (periods, stats)
    }

    #[test]
    fn test_numeric_summary() {
        let rows: Vec<Row> = [1.0, 2.0, 3.0, 4.0]
            .into_iter()
            .map(|v| row(&[("Valeur", CellValue::Number(v))]))
            .collect();
        let (_, stats) = analyse(&rows);
        let valeur = stats["Valeur"].as_numeric().unwrap();
        assert_eq!(valeur.sum, 10.0);
        assert_eq!(valeur.mean, 2.5);
        assert_eq!(valeur.median, 2.5);
        assert_eq!(valeur.min, 1.0);
        assert_eq!(valeur.max, 4.0);
        assert_eq!(valeur.count, 4);
        assert_eq!(valeur.stddev, 1.29);
        assert_eq!(valeur.quartiles, Quartiles { q1: 1.75, q2: 2.5, q3: 3.25 });
        assert!(valeur.period_values.is_none());
        assert!(valeur.variation.is_none());
    }

    #[test]
    fn test_currency_column_without_numbers_is_unusable() {
        let columns = vec![ColumnInfo {
            name: "Prix".into(),
            column_type: ColumnType::Currency,
            null_count: 0,
            total_count: 2,
            unique_count: 2,
            unique_sample: Vec::new(),
            sample: Default::default(),
        }];
        let rows = vec![row(&[("Prix", "n/a".into())]), row(&[("Prix", "-".into())])];
        let stats = compute_stats(&rows, &columns, &PeriodInfo::none()).unwrap();
        assert_eq!(
            stats["Prix"],
            ColumnStats::Unusable {
                column_type: ColumnType::Currency,
                error: NO_NUMERIC_VALUES.into()
            }
        );
    }

    #[test]
    fn test_period_values_and_variation() {
        let rows = vec![
            row(&[("Mois", "Janvier".into()), ("Ventes", CellValue::Number(100.0))]),
            row(&[("Mois", "janvier ".into()), ("Ventes", CellValue::Number(50.0))]),
            row(&[("Mois", "Fevrier".into()), ("Ventes", CellValue::Number(120.0))]),
            row(&[("Mois", "Mars".into()), ("Ventes", "225".into())]),
        ];
        let (periods, stats) = analyse(&rows);
        assert_eq!(periods.period_type, Some(PeriodType::Monthly));

        let ventes = stats["Ventes"].as_numeric().unwrap();
        let series: Vec<(&str, f64)> = ventes
            .period_values
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| (p.period.as_str(), p.value))
            .collect();
        assert_eq!(series, [("janvier", 150.0), ("fevrier", 120.0), ("mars", 225.0)]);

        let variation = ventes.variation.as_ref().unwrap();
        assert_eq!(variation.first_period, "janvier");
        assert_eq!(variation.last_period, "mars");
        assert_eq!(variation.change_percent, 50.0);
    }

    #[test]
    fn test_zero_first_period_skips_variation() {
        let rows = vec![
            row(&[("Mois", "Janvier".into()), ("Ventes", CellValue::Number(0.0))]),
            row(&[("Mois", "Fevrier".into()), ("Ventes", CellValue::Number(80.0))]),
        ];
        let (_, stats) = analyse(&rows);
        let ventes = stats["Ventes"].as_numeric().unwrap();
        assert_eq!(ventes.period_values.as_ref().unwrap().len(), 2);
        assert!(ventes.variation.is_none());
    }

    #[test]
    fn test_single_period_has_series_but_no_variation() {
        let periods = PeriodInfo {
            has_periods: true,
            period_column: Some("Date".into()),
            period_type: Some(PeriodType::Yearly),
            can_compare: false,
            periods: vec!["2024-05-01".into()],
            all_detected: Vec::new(),
            labels: PeriodLabels::CalendarDay,
        };
        let rows = vec![
            row(&[("Date", "01/05/2024".into()), ("Ventes", CellValue::Number(3.0))]),
            row(&[("Date", "2024-05-01".into()), ("Ventes", CellValue::Number(4.0))]),
        ];
        let columns = classify_columns(&rows);
        let stats = compute_stats(&rows, &columns, &periods).unwrap();
        let ventes = stats["Ventes"].as_numeric().unwrap();
        assert_eq!(
            ventes.period_values.as_deref(),
            Some(&[PeriodValue { period: "2024-05-01".into(), value: 7.0 }][..])
        );
        assert!(ventes.variation.is_none());
    }

    #[test]
    fn test_categorical_ranking_is_stable() {
        let rows: Vec<Row> = ["Sud", "Nord", "Nord", "Sud", "Est"]
            .into_iter()
            .map(|v| row(&[("Region", v.into())]))
            .collect();
        let (_, stats) = analyse(&rows);
        let ColumnStats::Categorical(region) = &stats["Region"] else {
            panic!("Region should be categorical");
        };
        assert_eq!(region.unique_count, 3);
        assert_eq!(region.top_value.as_deref(), Some("Sud"));
        assert_eq!(region.top_count, 2);
        let order: Vec<&str> = region.value_counts.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(order, ["Sud", "Nord", "Est"]);
    }

    #[test]
    fn test_value_counts_capped() {
        let rows: Vec<Row> = (0..40)
            .map(|i| row(&[("Code", CellValue::from(format!("c{}", i % 18)))]))
            .collect();
        let (_, stats) = analyse(&rows);
        let ColumnStats::Categorical(code) = &stats["Code"] else {
            panic!("Code should be categorical");
        };
        assert_eq!(code.unique_count, 18);
        assert_eq!(code.value_counts.len(), TOP_VALUES);
    }

    #[test]
    fn test_date_sample_and_text_skipped() {
        let rows: Vec<Row> = (1..=12)
            .map(|d| {
                row(&[
                    ("Jour", CellValue::from(format!("2024-01-{:02}", d))),
                    ("Note", CellValue::from(format!("commentaire numero {}", d))),
                ])
            })
            .collect();
        let columns = classify_columns(&rows);
        let stats = compute_stats(&rows, &columns, &PeriodInfo::none()).unwrap();
        let ColumnStats::Date(jour) = &stats["Jour"] else {
            panic!("Jour should be a date column");
        };
        assert_eq!(jour.unique_count, 12);
        assert_eq!(jour.sample.len(), DATE_SAMPLE);
        assert_eq!(jour.sample[0], "2024-01-01");
        // 12 distinct comments are still categorical
        assert!(stats.contains_key("Note"));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let rows = vec![
            row(&[("Valeur", CellValue::Number(f64::MAX))]),
            row(&[("Valeur", CellValue::Number(f64::MAX))]),
        ];
        let columns = classify_columns(&rows);
        let err = compute_stats(&rows, &columns, &PeriodInfo::none()).unwrap_err();
        assert!(matches!(err, ProfileError::NonFiniteAggregate { column } if column == "Valeur"));
    }

    #[test]
    fn test_overflow_after_rounding_is_an_error() {
        // finite on its own, infinite once scaled for rounding
        let rows = vec![
            row(&[("Region", CellValue::Text("Nord".into())), ("Valeur", CellValue::Number(1e307))]),
            row(&[("Region", CellValue::Text("Sud".into())), ("Valeur", CellValue::Null)]),
        ];
        let columns = classify_columns(&rows);
        let err = compute_stats(&rows, &columns, &PeriodInfo::none()).unwrap_err();
        assert!(matches!(err, ProfileError::NonFiniteAggregate { column } if column == "Valeur"));
    }
}
