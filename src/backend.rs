use crate::comprehensive::run_comprehensive_test;
use crate::errors::AppResult;
use crate::models::{CleanupResponse, ConnectionStatus, DatabaseInfo, RecordTestPayload, RecordTestResponse, TestOutcome};
use crate::store::ConnectionStore;

/// Request/response operations the CLI and the desktop panel call.
pub trait ConnectionBackend: Send + Sync {
    fn record_test(&self, payload: RecordTestPayload) -> AppResult<RecordTestResponse>;
    fn get_connection_status(&self, app_name: Option<&str>) -> AppResult<ConnectionStatus>;
    fn cleanup_test_records(&self, older_than_hours: Option<f64>) -> AppResult<CleanupResponse>;
    fn get_database_info(&self) -> AppResult<DatabaseInfo>;
    fn run_comprehensive_test(&self, app_name: &str) -> AppResult<TestOutcome>;
}

impl ConnectionBackend for ConnectionStore {
    fn record_test(&self, payload: RecordTestPayload) -> AppResult<RecordTestResponse> {
        ConnectionStore::record_test(self, payload)
    }

    fn get_connection_status(&self, app_name: Option<&str>) -> AppResult<ConnectionStatus> {
        ConnectionStore::get_connection_status(self, app_name)
    }

    fn cleanup_test_records(&self, older_than_hours: Option<f64>) -> AppResult<CleanupResponse> {
        ConnectionStore::cleanup_test_records(self, older_than_hours)
    }

    fn get_database_info(&self) -> AppResult<DatabaseInfo> {
        Ok(ConnectionStore::get_database_info(self))
    }

    fn run_comprehensive_test(&self, app_name: &str) -> AppResult<TestOutcome> {
        Ok(run_comprehensive_test(self, app_name))
    }
}
