use indexmap::IndexSet;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use smallvec::SmallVec;

use super::calendar::{is_month_axis, is_quarter_axis, parse_timestamp};
use super::normalize::is_numeric_value;
use crate::models::{CellValue, ColumnInfo, ColumnType, Row, SAMPLE_SIZE, UNIQUE_SAMPLE_SIZE};

const NUMERIC_RATIO: f64 = 0.8;
const SYMBOL_SAMPLE_SIZE: usize = 20;
const DATE_SAMPLE_SIZE: usize = 10;
const DATE_RATIO: f64 = 0.8;
const CATEGORICAL_MAX_UNIQUE: usize = 20;
const CATEGORICAL_MIN_VALUES: usize = 5;
const CATEGORICAL_UNIQUE_RATIO: f64 = 0.3;

static CURRENCY_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)eur|usd|\$|€|£|revenue|chiffre|ca_|montant|prix|cost|cout|budget|salaire|depense|recette")
        .expect("currency name pattern is valid")
});

static PERCENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)taux|ratio|percent|pourcentage|marge|part_|share|conversion|croissance|evolution")
        .expect("percentage name pattern is valid")
});

/// Classify every column named by the first row, in column order.
pub fn classify_columns(rows: &[Row]) -> Vec<ColumnInfo> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let headers: Vec<&String> = first.keys().collect();

    headers
        .par_iter()
        .map(|name| {
            let values = column_values(rows, name);
            let column_type = infer_type(name, &values);
            column_info(name, column_type, rows.len(), &values)
        })
        .collect()
}

/// Non-empty cells of a column; rows lacking the column count as null.
pub(crate) fn column_values<'a>(rows: &'a [Row], name: &str) -> Vec<&'a CellValue> {
    rows.iter()
        .filter_map(|row| row.get(name))
        .filter(|value| !value.is_empty())
        .collect()
}

/// The heuristic chain, in priority order:
/// numeric, month names, quarter labels, parseable dates, categorical, text.
pub fn infer_type(name: &str, values: &[&CellValue]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Text;
    }

    let numeric_count = values.iter().filter(|v| is_numeric_value(v)).count();
    if numeric_count as f64 / values.len() as f64 > NUMERIC_RATIO {
        return numeric_flavour(name, values);
    }

    let labels: Vec<String> = values.iter().map(|v| v.label()).collect();
    if is_month_axis(&labels) || is_quarter_axis(&labels) {
        return ColumnType::Date;
    }

    let date_sample = &values[..values.len().min(DATE_SAMPLE_SIZE)];
    let parsed = date_sample
        .iter()
        .filter(|v| parse_timestamp(&v.to_string()).is_some())
        .count();
    if parsed as f64 / date_sample.len() as f64 > DATE_RATIO {
        return ColumnType::Date;
    }

    let unique = values.iter().map(|v| v.identity()).collect::<IndexSet<_>>().len();
    if unique <= CATEGORICAL_MAX_UNIQUE
        || (values.len() > CATEGORICAL_MIN_VALUES
            && (unique as f64 / values.len() as f64) < CATEGORICAL_UNIQUE_RATIO)
    {
        return ColumnType::Categorical;
    }

    ColumnType::Text
}

fn numeric_flavour(name: &str, values: &[&CellValue]) -> ColumnType {
    if CURRENCY_NAME.is_match(name) {
        return ColumnType::Currency;
    }
    if PERCENT_NAME.is_match(name) {
        return ColumnType::Percentage;
    }

    let sample = values
        .iter()
        .take(SYMBOL_SAMPLE_SIZE)
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    if sample.contains(&['€', '$', '£'][..]) {
        ColumnType::Currency
    } else if sample.contains('%') {
        ColumnType::Percentage
    } else {
        ColumnType::Numeric
    }
}

fn column_info(name: &str, column_type: ColumnType, total_count: usize, values: &[&CellValue]) -> ColumnInfo {
    let mut unique = IndexSet::new();
    let mut unique_sample = Vec::new();
    for &value in values {
        if unique.insert(value.identity()) && unique_sample.len() < UNIQUE_SAMPLE_SIZE {
            unique_sample.push(value.to_string());
        }
    }
    let sample: SmallVec<[String; SAMPLE_SIZE]> = values
        .iter()
        .take(SAMPLE_SIZE)
        .map(|v| v.to_string())
        .collect();

    ColumnInfo {
        name: name.to_string(),
        column_type,
        null_count: total_count - values.len(),
        total_count,
        unique_count: unique.len(),
        unique_sample,
        sample,
    }
}
