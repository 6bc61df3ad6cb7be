use crate::db::{Database, NewConnectionTest};
use crate::errors::{AppError, AppResult};
use crate::models::{CleanupResponse, ConnectionStatus, DatabaseInfo, RecordTestPayload, RecordTestResponse};
use chrono::Utc;
use std::sync::Arc;

pub const STATUS_SCAN_LIMIT: u32 = 100;
pub const DEFAULT_CLEANUP_HOURS: f64 = 24.0;
pub const UNKNOWN_DEPLOYMENT: &str = "unknown";

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Backend operations over the `connection_tests` table, bound to one deployment.
#[derive(Debug, Clone)]
pub struct ConnectionStore {
    db: Arc<Database>,
    deployment_id: String,
}

impl ConnectionStore {
    pub fn new(db: Arc<Database>, deployment_id: Option<&str>) -> Self {
        let deployment_id = deployment_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_DEPLOYMENT)
            .to_string();
        Self { db, deployment_id }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    pub fn record_test(&self, payload: RecordTestPayload) -> AppResult<RecordTestResponse> {
        validate_app_name(&payload.app_name)?;
        let test_data = payload
            .test_data
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("Connection test from {}", payload.app_name));

        let record = self.db.insert_connection_test(&NewConnectionTest {
            app_name: &payload.app_name,
            timestamp: payload.timestamp,
            test_data: Some(&test_data),
            test_type: None,
        })?;
        tracing::debug!(app = %record.app_name, record_id = %record.id, "recorded connection test");

        Ok(RecordTestResponse {
            success: true,
            record_id: record.id,
            message: format!("Successfully connected from {}", payload.app_name),
            timestamp: payload.timestamp,
        })
    }

    /// Only the newest `STATUS_SCAN_LIMIT` records are considered, so apps that
    /// last connected before that window are not reported.
    pub fn get_connection_status(&self, app_name: Option<&str>) -> AppResult<ConnectionStatus> {
        let tests = self.db.list_recent_connection_tests(STATUS_SCAN_LIMIT)?;

        let mut connected_apps: Vec<String> = Vec::new();
        for test in &tests {
            if !connected_apps.iter().any(|app| app == &test.app_name) {
                connected_apps.push(test.app_name.clone());
            }
        }

        let app_specific_test = app_name
            .and_then(|name| tests.iter().find(|test| test.app_name == name))
            .cloned();

        Ok(ConnectionStatus {
            success: true,
            total_tests: tests.len(),
            connected_apps,
            last_test: tests.first().cloned(),
            app_specific_test,
            deployment_id: self.deployment_id.clone(),
        })
    }

    pub fn cleanup_test_records(&self, older_than_hours: Option<f64>) -> AppResult<CleanupResponse> {
        self.cleanup_test_records_at(Utc::now().timestamp_millis(), older_than_hours)
    }

    pub fn cleanup_test_records_at(&self, now_ms: i64, older_than_hours: Option<f64>) -> AppResult<CleanupResponse> {
        let hours = match older_than_hours {
            Some(hours) if hours.is_finite() && hours != 0.0 => hours,
            _ => DEFAULT_CLEANUP_HOURS,
        };
        if hours < 0.0 {
            return Err(AppError::Validation(format!(
                "olderThanHours must not be negative, got {}",
                hours
            )));
        }
        // The float cast saturates; the subtraction must too.
        let cutoff = now_ms.saturating_sub((hours * MS_PER_HOUR) as i64);
        let deleted_count = self.db.delete_connection_tests_before(cutoff)?;
        tracing::info!(deleted = deleted_count, hours, "cleaned up connection test records");

        Ok(CleanupResponse {
            success: true,
            deleted_count,
            message: format!(
                "Cleaned up {} test records older than {} hours",
                deleted_count, hours
            ),
        })
    }

    pub fn get_database_info(&self) -> DatabaseInfo {
        DatabaseInfo {
            deployment_id: self.deployment_id.clone(),
            timestamp: Utc::now().timestamp_millis(),
            message: "Database connection verified".to_string(),
        }
    }
}

pub(crate) fn validate_app_name(app_name: &str) -> AppResult<()> {
    if app_name.trim().is_empty() {
        return Err(AppError::Validation("appName cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConnectionStore, STATUS_SCAN_LIMIT, UNKNOWN_DEPLOYMENT};
    use crate::db::Database;
    use crate::errors::AppError;
    use crate::models::RecordTestPayload;
    use chrono::Utc;
    use std::sync::Arc;

    fn store(dir: &tempfile::TempDir, deployment: Option<&str>) -> ConnectionStore {
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        ConnectionStore::new(Arc::new(db), deployment)
    }

    fn record(store: &ConnectionStore, app: &str, timestamp: i64) -> String {
        store
            .record_test(RecordTestPayload {
                app_name: app.to_string(),
                timestamp,
                test_data: None,
            })
            .expect("record test")
            .record_id
    }

    #[test]
    fn record_test_defaults_test_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, Some("dev:happy-otter-123"));

        let response = store
            .record_test(RecordTestPayload {
                app_name: "web".to_string(),
                timestamp: 42,
                test_data: None,
            })
            .expect("record");
        assert!(response.success);
        assert_eq!(response.message, "Successfully connected from web");
        assert_eq!(response.timestamp, 42);

        let stored = store
            .database()
            .get_connection_test(&response.record_id)
            .expect("get")
            .expect("exists");
        assert_eq!(stored.test_data.as_deref(), Some("Connection test from web"));
        assert!(stored.test_type.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&stored.created_at).is_ok());
    }

    #[test]
    fn record_test_rejects_blank_app_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, None);

        let error = store
            .record_test(RecordTestPayload {
                app_name: "  ".to_string(),
                timestamp: 1,
                test_data: None,
            })
            .expect_err("blank app name");
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[test]
    fn status_reports_read_after_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, Some("dev:happy-otter-123"));

        record(&store, "mcp", 1);
        let id = record(&store, "web", 2);

        let status = store.get_connection_status(Some("web")).expect("status");
        assert_eq!(status.app_specific_test.expect("app test").id, id);
        assert_eq!(status.last_test.expect("last test").id, id);
        assert_eq!(status.total_tests, 2);
        assert_eq!(status.deployment_id, "dev:happy-otter-123");
    }

    #[test]
    fn status_dedupes_apps_in_first_seen_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, None);

        record(&store, "docs", 1);
        record(&store, "web", 2);
        record(&store, "docs", 3);
        record(&store, "mcp", 4);
        record(&store, "web", 5);

        let status = store.get_connection_status(None).expect("status");
        assert_eq!(status.connected_apps, vec!["web", "mcp", "docs"]);
        assert!(status.app_specific_test.is_none());
        assert_eq!(status.deployment_id, UNKNOWN_DEPLOYMENT);
    }

    #[test]
    fn status_on_empty_store_has_no_last_test() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, Some("   "));

        let status = store.get_connection_status(Some("web")).expect("status");
        assert_eq!(status.total_tests, 0);
        assert!(status.connected_apps.is_empty());
        assert!(status.last_test.is_none());
        assert!(status.app_specific_test.is_none());
        assert_eq!(status.deployment_id, UNKNOWN_DEPLOYMENT);
    }

    #[test]
    fn status_scan_window_hides_older_apps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, None);

        record(&store, "docs", 0);
        for ts in 1..=i64::from(STATUS_SCAN_LIMIT) {
            record(&store, "web", ts);
        }

        let status = store.get_connection_status(Some("docs")).expect("status");
        assert_eq!(status.total_tests, STATUS_SCAN_LIMIT as usize);
        assert_eq!(status.connected_apps, vec!["web"]);
        assert!(status.app_specific_test.is_none());
    }

    #[test]
    fn cleanup_removes_only_records_older_than_threshold() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, None);
        let now = Utc::now().timestamp_millis();
        let hour = 3_600_000;

        record(&store, "web", now - 48 * hour);
        record(&store, "mcp", now - 25 * hour);
        let fresh = record(&store, "docs", now - hour);

        let first = store.cleanup_test_records_at(now, None).expect("cleanup");
        assert!(first.success);
        assert_eq!(first.deleted_count, 2);
        assert_eq!(first.message, "Cleaned up 2 test records older than 24 hours");

        let second = store.cleanup_test_records_at(now, None).expect("cleanup again");
        assert_eq!(second.deleted_count, 0);

        let status = store.get_connection_status(None).expect("status");
        assert_eq!(status.total_tests, 1);
        assert_eq!(status.last_test.expect("remaining").id, fresh);
    }

    #[test]
    fn cleanup_honours_custom_threshold_and_zero_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, None);
        let now = 10 * 3_600_000;

        record(&store, "web", now - 2 * 3_600_000);
        record(&store, "web", now - 30 * 60_000);

        let zero = store.cleanup_test_records_at(now, Some(0.0)).expect("zero hours");
        assert_eq!(zero.deleted_count, 0);

        let one = store.cleanup_test_records_at(now, Some(1.0)).expect("one hour");
        assert_eq!(one.deleted_count, 1);
        assert_eq!(one.message, "Cleaned up 1 test records older than 1 hours");
    }

    #[test]
    fn cleanup_rejects_negative_threshold_and_clamps_huge_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, None);
        let now = Utc::now().timestamp_millis();
        record(&store, "web", now - 3_600_000);

        let error = store
            .cleanup_test_records(Some(-1e300))
            .expect_err("negative hours");
        assert!(matches!(error, AppError::Validation(_)));
        assert!(store.cleanup_test_records(Some(-1.0)).is_err());

        let huge = store.cleanup_test_records_at(i64::MIN + 1, Some(1e300)).expect("huge hours");
        assert_eq!(huge.deleted_count, 0);
        assert_eq!(store.database().count_connection_tests().expect("count"), 1);
    }

    #[test]
    fn database_info_has_no_side_effects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir, Some("prod:quiet-fox-9"));

        let info = store.get_database_info();
        assert_eq!(info.deployment_id, "prod:quiet-fox-9");
        assert_eq!(info.message, "Database connection verified");
        assert_eq!(store.database().count_connection_tests().expect("count"), 0);
    }
}
