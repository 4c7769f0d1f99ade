use std::collections::HashSet;
use std::io::Cursor;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use tracing::{debug, info};

use super::utils::{dedupe_header, excel_serial_to_text};
use crate::error::AppError;
use crate::models::{CellValue, Dataset, Row};

/// The first sheet of a workbook, materialized as rows.
#[derive(Debug, Clone)]
pub struct SheetData {
    pub sheet_names: Vec<String>,
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Dataset,
}

pub fn read_workbook(file_data: Bytes) -> Result<SheetData, AppError> {
    let cursor = Cursor::new(file_data);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| AppError::FileProcessingError(format!("Failed to open Excel file: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| AppError::FileProcessingError("Workbook has no sheets".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut grid = range.rows();

    let mut existing_names = HashSet::new();
    let headers: Vec<String> = grid
        .next()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| dedupe_header(&header_text(cell), i, &mut existing_names))
                .collect()
        })
        .unwrap_or_default();

    let rows: Dataset = grid
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| to_row(&headers, cells))
        .collect();

    info!(
        "Read sheet {} ({} sheets in workbook): {} rows x {} columns",
        sheet_name,
        sheet_names.len(),
        rows.len(),
        headers.len()
    );

    Ok(SheetData {
        sheet_names,
        sheet_name,
        headers,
        rows,
    })
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        other => to_cell(other).to_string(),
    }
}

/// Short rows are padded so every row carries every header.
fn to_row(headers: &[String], cells: &[Data]) -> Row {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let value = cells.get(i).map_or(CellValue::Null, to_cell);
            (header.clone(), value)
        })
        .collect()
}

fn to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(d) => match excel_serial_to_text(d.as_f64()) {
            Some(text) => CellValue::Text(text),
            None => {
                debug!("Unreadable Excel date serial {}", d.as_f64());
                CellValue::Null
            }
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
