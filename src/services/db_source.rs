use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{types::ValueRef, Connection, OpenFlags};
use tracing::{debug, error, info, warn};

use super::excel::utils::dedupe_header;
use crate::error::AppError;
use crate::models::{CellValue, Dataset, Row};

const FORBIDDEN_PREFIXES: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "GRANT", "REVOKE",
];

/// A read-only SQLite database whose query results feed the profiler.
pub struct DbSource {
    conn: Mutex<Connection>,
    max_rows: usize,
}

#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Dataset,
    pub truncated: bool,
}

impl DbSource {
    pub fn open(path: impl AsRef<Path>, max_rows: usize) -> Result<Self, AppError> {
        let path = path.as_ref();
        info!("Opening read-only database {}", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            error!("Failed to open database {}: {}", path.display(), e);
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            max_rows,
        })
    }

    pub fn query(&self, sql: &str) -> Result<QueryOutput, AppError> {
        validate_query(sql)?;

        let conn = self.conn.lock().map_err(|e| {
            error!("Failed to acquire database lock: {}", e);
            AppError::DatabaseError(e.to_string())
        })?;

        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            warn!("Rejected statement that writes to the database");
            return Err(AppError::InvalidInput("Only read-only queries are allowed".to_string()));
        }

        let mut existing_names = HashSet::new();
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .enumerate()
            .map(|(i, name)| dedupe_header(name, i, &mut existing_names))
            .collect();
        debug!("Query columns: {:?}", columns);

        let mut rows = Vec::new();
        let mut truncated = false;
        let mut cursor = stmt.query([])?;
        while let Some(record) = cursor.next()? {
            if rows.len() == self.max_rows {
                truncated = true;
                break;
            }
            let mut row = Row::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                row.insert(name.clone(), to_cell(record.get_ref(i)?));
            }
            rows.push(row);
        }

        info!("Query returned {} rows (truncated: {})", rows.len(), truncated);
        Ok(QueryOutput {
            columns,
            rows,
            truncated,
        })
    }
}

/// Reject empty SQL and statements that obviously modify data.
pub fn validate_query(sql: &str) -> Result<(), AppError> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("SQL query is empty".to_string()));
    }

    let upper = trimmed.to_uppercase();
    if let Some(keyword) = FORBIDDEN_PREFIXES.iter().find(|k| upper.starts_with(*k)) {
        return Err(AppError::InvalidInput(format!("{} statements are not allowed", keyword)));
    }

    Ok(())
}

fn to_cell(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Number(i as f64),
        ValueRef::Real(f) => CellValue::Number(f),
        ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ventes.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE ventes (mois TEXT, region TEXT, montant REAL, photo BLOB);
             INSERT INTO ventes VALUES ('Janvier', 'Nord', 45000, x'00');
             INSERT INTO ventes VALUES ('Janvier', 'Sud', 38000.5, NULL);
             INSERT INTO ventes VALUES ('Fevrier', 'Nord', 52000, NULL);",
        )
        .unwrap();
        (dir, path)
    }

    #[test]
    fn test_validate_query() {
        assert!(validate_query("SELECT * FROM ventes").is_ok());
        assert!(validate_query("  with t as (select 1) select * from t").is_ok());
        assert!(matches!(validate_query("   "), Err(AppError::InvalidInput(_))));
        assert!(matches!(validate_query("delete from ventes"), Err(AppError::InvalidInput(_))));
        assert!(matches!(validate_query(" Drop TABLE ventes"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_query_maps_values() {
        let (_dir, path) = fixture();
        let db = DbSource::open(&path, 100).unwrap();
        let output = db.query("SELECT mois, montant, photo FROM ventes ORDER BY rowid").unwrap();
        assert_eq!(output.columns, ["mois", "montant", "photo"]);
        assert_eq!(output.rows.len(), 3);
        assert!(!output.truncated);
        assert_eq!(output.rows[0]["mois"], CellValue::from("Janvier"));
        assert_eq!(output.rows[1]["montant"], CellValue::Number(38000.5));
        assert_eq!(output.rows[0]["photo"], CellValue::Null);
    }

    #[test]
    fn test_query_truncates() {
        let (_dir, path) = fixture();
        let db = DbSource::open(&path, 2).unwrap();
        let output = db.query("SELECT * FROM ventes").unwrap();
        assert_eq!(output.rows.len(), 2);
        assert!(output.truncated);
    }

    #[test]
    fn test_duplicate_column_names() {
        let (_dir, path) = fixture();
        let db = DbSource::open(&path, 10).unwrap();
        let output = db.query("SELECT mois, mois FROM ventes").unwrap();
        assert_eq!(output.columns, ["mois", "mois_1"]);
    }

    #[test]
    fn test_writes_are_refused() {
        let (_dir, path) = fixture();
        let db = DbSource::open(&path, 10).unwrap();
        // passes the keyword check, caught by the statement itself
        let err = db.query("REPLACE INTO ventes VALUES ('Mars', 'Sud', 1, NULL)").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
