use crate::models::CellValue;

/// Coerce a cell to a number, stripping currency symbols, percent signs and
/// whitespace, and reading a comma as the decimal separator.
///
/// Returns `None` where a lenient parser would produce NaN.
pub fn clean_numeric(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        CellValue::Text(text) => clean_numeric_text(text),
        CellValue::Null | CellValue::Bool(_) => None,
    }
}

pub fn is_numeric_value(value: &CellValue) -> bool {
    clean_numeric(value).is_some()
}

fn clean_numeric_text(text: &str) -> Option<f64> {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '£' | '%') && !c.is_whitespace())
        .collect();
    let cleaned = stripped.replacen(',', ".", 1);

    // f64::from_str also accepts "inf" and "NaN", which are not figures.
    if cleaned.is_empty()
        || !cleaned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-' | b'e' | b'E'))
    {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Round to 2 decimals, halves toward positive infinity.
pub fn round2(n: f64) -> f64 {
    (n * 100.0 + 0.5).floor() / 100.0
}

pub fn median(sorted: &[f64]) -> Option<f64> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 != 0 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Linear interpolation between closest ranks at position `(n - 1) * q`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Sample standard deviation; 0 for fewer than two values.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sq_diffs: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sq_diffs / (values.len() - 1) as f64).sqrt()
}
