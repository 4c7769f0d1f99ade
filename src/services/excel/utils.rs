use std::collections::HashSet;

use bytes::Bytes;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use reqwest::Client;

use crate::error::AppError;

/// Trim a header and make it unique within the sheet.
/// Blank headers become `column_{n}` (1-based); repeats get `_1`, `_2`, ...
pub fn dedupe_header(name: &str, position: usize, existing_names: &mut HashSet<String>) -> String {
    let trimmed = name.trim();
    let base_name = if trimmed.is_empty() {
        format!("column_{}", position + 1)
    } else {
        trimmed.to_string()
    };

    let mut cleaned = base_name.clone();
    let mut counter = 1;
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}_{}", base_name, counter);
        counter += 1;
    }

    cleaned
}

/// Render an Excel serial date (days since 1899-12-30) as ISO text.
/// Whole days print as `YYYY-MM-DD`, anything else with a time part.
pub fn excel_serial_to_text(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let timestamp: NaiveDateTime = epoch.checked_add_signed(Duration::try_milliseconds(millis)?)?;

    if timestamp.num_seconds_from_midnight() == 0 {
        Some(timestamp.format("%Y-%m-%d").to_string())
    } else {
        Some(timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

pub async fn load_file_from_url(url: &str, max_bytes: usize) -> Result<Bytes, AppError> {
    let client = Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::FileProcessingError(format!("Failed to fetch file: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::FileProcessingError(format!(
            "Failed to fetch file. Status: {}",
            response.status()
        )));
    }

    if let Some(length) = response.content_length() {
        if length as usize > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File is {} bytes, limit is {}",
                length, max_bytes
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::FileProcessingError(format!("Failed to read response bytes: {}", e)))?;

    if bytes.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {} bytes, limit is {}",
            bytes.len(),
            max_bytes
        )));
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_header() {
        let mut seen = HashSet::new();
        assert_eq!(dedupe_header(" Ventes ", 0, &mut seen), "Ventes");
        assert_eq!(dedupe_header("Ventes", 1, &mut seen), "Ventes_1");
        assert_eq!(dedupe_header("Ventes", 2, &mut seen), "Ventes_2");
        assert_eq!(dedupe_header("", 3, &mut seen), "column_4");
        assert_eq!(dedupe_header("Prix HT", 4, &mut seen), "Prix HT");
    }

    #[test]
    fn test_excel_serial_to_text() {
        assert_eq!(excel_serial_to_text(45292.0).as_deref(), Some("2024-01-01"));
        assert_eq!(excel_serial_to_text(45292.5).as_deref(), Some("2024-01-01 12:00:00"));
        assert_eq!(excel_serial_to_text(1.0).as_deref(), Some("1899-12-31"));
        assert_eq!(excel_serial_to_text(f64::NAN), None);
    }
}
