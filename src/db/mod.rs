use crate::errors::{AppError, AppResult};
use crate::models::ConnectionTestRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const RECORD_COLUMNS: &str = "id, app_name, timestamp, test_data, created_at, test_type";

/// Fields supplied by the caller for a new `connection_tests` row.
#[derive(Debug, Clone)]
pub struct NewConnectionTest<'a> {
    pub app_name: &'a str,
    pub timestamp: i64,
    pub test_data: Option<&'a str>,
    pub test_type: Option<&'a str>,
}

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn insert_connection_test(&self, input: &NewConnectionTest<'_>) -> AppResult<ConnectionTestRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO connection_tests (id, app_name, timestamp, test_data, created_at, test_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                input.app_name,
                input.timestamp,
                input.test_data,
                created_at,
                input.test_type,
            ],
        )?;

        Ok(ConnectionTestRecord {
            id,
            app_name: input.app_name.to_string(),
            timestamp: input.timestamp,
            test_data: input.test_data.map(ToString::to_string),
            created_at,
            test_type: input.test_type.map(ToString::to_string),
        })
    }

    pub fn get_connection_test(&self, id: &str) -> AppResult<Option<ConnectionTestRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let query = format!("SELECT {} FROM connection_tests WHERE id = ?1", RECORD_COLUMNS);
        conn.query_row(&query, [id], parse_connection_test_row)
            .optional()
            .map_err(AppError::from)
    }

    /// Newest first. Ties on `timestamp` fall back to insertion order.
    pub fn list_recent_connection_tests(&self, limit: u32) -> AppResult<Vec<ConnectionTestRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let query = format!(
            "SELECT {} FROM connection_tests ORDER BY timestamp DESC, seq DESC LIMIT ?1",
            RECORD_COLUMNS
        );
        let mut statement = conn.prepare(&query)?;
        let rows = statement.query_map([limit], parse_connection_test_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Records for one app, newest first. `None` reads every matching row.
    pub fn list_connection_tests_for_app(
        &self,
        app_name: &str,
        limit: Option<u32>,
    ) -> AppResult<Vec<ConnectionTestRecord>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut query = format!(
            "SELECT {} FROM connection_tests WHERE app_name = ?1 ORDER BY timestamp DESC, seq DESC",
            RECORD_COLUMNS
        );
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(i64::from).unwrap_or(-1);
        query.push_str(" LIMIT ?2");

        let mut statement = conn.prepare(&query)?;
        let rows = statement.query_map(params![app_name, limit], parse_connection_test_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn count_connection_tests(&self) -> AppResult<u64> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM connection_tests", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn delete_connection_tests_before(&self, cutoff_ms: i64) -> AppResult<usize> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let deleted = conn.execute("DELETE FROM connection_tests WHERE timestamp < ?1", [cutoff_ms])?;
        Ok(deleted)
    }

    #[cfg(test)]
    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> AppResult<T> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        f(&conn).map_err(AppError::from)
    }
}

fn parse_connection_test_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConnectionTestRecord> {
    Ok(ConnectionTestRecord {
        id: row.get(0)?,
        app_name: row.get(1)?,
        timestamp: row.get(2)?,
        test_data: row.get(3)?,
        created_at: row.get(4)?,
        test_type: row.get(5)?,
    })
}
