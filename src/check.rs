use crate::backend::ConnectionBackend;
use crate::env_check::check_environment_files;
use crate::errors::AppResult;
use crate::models::{AppRoundResult, EnvFileState, RunSummary, TestOutcome};
use crate::store::DEFAULT_CLEANUP_HOURS;
use chrono::{Local, TimeZone};
use std::io::Write;
use std::path::Path;

pub const SUCCESS_MESSAGE: &str = "All apps are successfully connected to the same Convex database!";

/// Full script flow: env consistency, one round per app in order, status,
/// cleanup, summary. Report text goes to `out`.
pub fn run_connection_check(
    root: &Path,
    backend: &dyn ConnectionBackend,
    apps: &[&str],
    out: &mut dyn Write,
) -> AppResult<RunSummary> {
    writeln!(out, "🚀 Starting Convex Database Connection Test\n")?;

    let env_consistent = report_environment_files(root, apps, out)?;
    writeln!(out)?;
    if !env_consistent {
        writeln!(
            out,
            "❌ Environment files are not consistent. Please check your .env.local files."
        )?;
        return Ok(RunSummary {
            env_consistent,
            results: Vec::new(),
            deployment_ids: Vec::new(),
            passed: false,
        });
    }

    let mut results = Vec::with_capacity(apps.len());
    for app in apps {
        results.push(test_app_connection(backend, app, out)?);
        writeln!(out)?;
    }

    report_connection_status(backend, out)?;

    writeln!(out, "\n🧹 Cleaning up old test records...")?;
    match backend.cleanup_test_records(Some(DEFAULT_CLEANUP_HOURS)) {
        Ok(cleanup) => writeln!(out, "   🧹 Cleaned up {} old test records", cleanup.deleted_count)?,
        Err(error) => {
            tracing::warn!(error = %error, "connection test cleanup failed");
            writeln!(out, "   ⚠️  Cleanup failed: {}", error)?;
        }
    }

    let summary = summarize(results);
    write_summary(&summary, out)?;
    Ok(summary)
}

pub fn report_environment_files(root: &Path, apps: &[&str], out: &mut dyn Write) -> AppResult<bool> {
    writeln!(out, "🔍 Checking environment files...")?;
    let report = check_environment_files(root, apps);

    for file in &report.files {
        match &file.state {
            EnvFileState::Ok { deployment } => writeln!(out, "   ✅ {}: {}", file.path, deployment)?,
            EnvFileState::Missing => writeln!(out, "   ⚠️  {}: Missing CONVEX_URL or CONVEX_DEPLOYMENT", file.path)?,
            EnvFileState::Unreadable { .. } => writeln!(out, "   ❌ {}: File not found or unreadable", file.path)?,
        }
    }

    if report.consistent {
        writeln!(out, "   ✅ All environment files use the same Convex configuration")?;
    } else {
        tracing::warn!(distinct = report.distinct_configs, "environment files disagree");
        writeln!(out, "   ❌ Found {} different Convex configurations", report.distinct_configs)?;
    }
    Ok(report.consistent)
}

pub fn test_app_connection(
    backend: &dyn ConnectionBackend,
    app_name: &str,
    out: &mut dyn Write,
) -> AppResult<AppRoundResult> {
    writeln!(out, "🧪 Testing {} app...", app_name)?;

    // Only backend errors land in `round`; report write failures propagate.
    let round = match backend.get_database_info() {
        Ok(info) => {
            writeln!(out, "   ✅ Database info retrieved: {}", info.deployment_id)?;
            backend
                .run_comprehensive_test(app_name)
                .map(|outcome| (info, outcome))
        }
        Err(error) => Err(error),
    };

    let result = match round {
        Ok((info, TestOutcome::Passed(report))) => {
            writeln!(out, "   ✅ All database operations successful")?;
            writeln!(out, "   📊 Tests passed: {}", report.tests.step_count())?;
            AppRoundResult {
                app_name: app_name.to_string(),
                success: true,
                deployment_id: Some(info.deployment_id),
                timestamp: Some(report.database_info.timestamp),
                error: None,
            }
        }
        Ok((_, TestOutcome::Failed(failure))) => {
            writeln!(out, "   ❌ Test failed: {}", failure.error)?;
            failed_round(app_name, failure.error)
        }
        Err(error) => {
            tracing::warn!(app = %app_name, error = %error, "connection round failed");
            writeln!(out, "   ❌ Connection failed: {}", error)?;
            failed_round(app_name, error.to_string())
        }
    };
    Ok(result)
}

fn failed_round(app_name: &str, error: String) -> AppRoundResult {
    AppRoundResult {
        app_name: app_name.to_string(),
        success: false,
        deployment_id: None,
        timestamp: None,
        error: Some(error),
    }
}

fn report_connection_status(backend: &dyn ConnectionBackend, out: &mut dyn Write) -> AppResult<()> {
    match backend.get_connection_status(None) {
        Ok(status) => {
            writeln!(out, "\n📊 Connection Status:")?;
            writeln!(out, "   Total tests: {}", status.total_tests)?;
            writeln!(out, "   Connected apps: {}", status.connected_apps.join(", "))?;
            writeln!(out, "   Deployment ID: {}", status.deployment_id)?;
            if let Some(last) = status.last_test {
                writeln!(out, "   Last test: {} at {}", last.app_name, format_local_time(last.timestamp))?;
            }
        }
        Err(error) => {
            tracing::warn!(error = %error, "connection status query failed");
            writeln!(out, "   ❌ Failed to get connection status: {}", error)?;
        }
    }
    Ok(())
}

pub fn summarize(results: Vec<AppRoundResult>) -> RunSummary {
    let mut deployment_ids: Vec<String> = Vec::new();
    for id in results.iter().filter_map(|result| result.deployment_id.as_ref()) {
        if !deployment_ids.contains(id) {
            deployment_ids.push(id.clone());
        }
    }

    let all_succeeded = !results.is_empty() && results.iter().all(|result| result.success);
    RunSummary {
        env_consistent: true,
        passed: all_succeeded && deployment_ids.len() == 1,
        results,
        deployment_ids,
    }
}

fn write_summary(summary: &RunSummary, out: &mut dyn Write) -> AppResult<()> {
    let total = summary.results.len();
    let failed: Vec<&AppRoundResult> = summary.results.iter().filter(|result| !result.success).collect();

    writeln!(out, "\n📋 Test Summary:")?;
    writeln!(out, "   ✅ Successful: {}/{}", total - failed.len(), total)?;
    writeln!(out, "   ❌ Failed: {}/{}", failed.len(), total)?;

    match summary.deployment_ids.as_slice() {
        [] => {}
        [single] => writeln!(out, "   🎯 All successful tests use the same database: {}", single)?,
        many => writeln!(out, "   ⚠️  Tests are using different databases: {}", many.join(", "))?,
    }

    if !failed.is_empty() {
        writeln!(out, "\n❌ Failed Tests:")?;
        for result in failed {
            writeln!(
                out,
                "   - {}: {}",
                result.app_name,
                result.error.as_deref().unwrap_or("Unknown error")
            )?;
        }
    }

    if summary.passed {
        writeln!(out, "\n🎉 {}", SUCCESS_MESSAGE)?;
    } else {
        writeln!(out, "\n⚠️  Some apps failed to connect or are using different databases.")?;
    }
    Ok(())
}

pub fn format_local_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_local_time, summarize, test_app_connection};
    use crate::backend::ConnectionBackend;
    use crate::db::Database;
    use crate::errors::{AppError, AppResult};
    use crate::models::{
        AppRoundResult, CleanupResponse, ConnectionStatus, DatabaseInfo, RecordTestPayload, RecordTestResponse,
        TestOutcome,
    };
    use crate::store::ConnectionStore;
    use std::io::{self, Write};
    use std::sync::Arc;

    struct OfflineBackend;

    impl ConnectionBackend for OfflineBackend {
        fn record_test(&self, _payload: RecordTestPayload) -> AppResult<RecordTestResponse> {
            Err(AppError::Io("offline".to_string()))
        }
        fn get_connection_status(&self, _app_name: Option<&str>) -> AppResult<ConnectionStatus> {
            Err(AppError::Io("offline".to_string()))
        }
        fn cleanup_test_records(&self, _older_than_hours: Option<f64>) -> AppResult<CleanupResponse> {
            Err(AppError::Io("offline".to_string()))
        }
        fn get_database_info(&self) -> AppResult<DatabaseInfo> {
            Err(AppError::Io("offline".to_string()))
        }
        fn run_comprehensive_test(&self, _app_name: &str) -> AppResult<TestOutcome> {
            Err(AppError::Io("offline".to_string()))
        }
    }

    fn passed(app: &str, deployment: &str) -> AppRoundResult {
        AppRoundResult {
            app_name: app.to_string(),
            success: true,
            deployment_id: Some(deployment.to_string()),
            timestamp: Some(1),
            error: None,
        }
    }

    #[test]
    fn app_round_succeeds_against_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let store = ConnectionStore::new(Arc::new(db), Some("dev:otter"));
        let mut out = Vec::new();

        let result = test_app_connection(&store, "web", &mut out).expect("round");
        assert!(result.success);
        assert_eq!(result.deployment_id.as_deref(), Some("dev:otter"));
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Database info retrieved: dev:otter"));
        assert!(text.contains("Tests passed: 4"));
    }

    #[test]
    fn app_round_reports_connection_failure() {
        let mut out = Vec::new();
        let result = test_app_connection(&OfflineBackend, "docs", &mut out).expect("round");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("IO_FAILURE: offline"));
        assert!(String::from_utf8(out).expect("utf8").contains("Connection failed: IO_FAILURE: offline"));
    }

    /// Accepts writes until the buffered text mentions `marker`.
    struct BrokenPipeAfter {
        marker: &'static str,
        buffer: Vec<u8>,
    }

    impl Write for BrokenPipeAfter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buffer.extend_from_slice(data);
            if String::from_utf8_lossy(&self.buffer).contains(self.marker) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"));
            }
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn report_write_error_is_not_a_connection_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let store = ConnectionStore::new(Arc::new(db), Some("dev:otter"));
        let mut out = BrokenPipeAfter {
            marker: "Database info retrieved",
            buffer: Vec::new(),
        };

        let error = test_app_connection(&store, "web", &mut out).expect_err("write error propagates");
        assert!(matches!(error, AppError::Io(_)));
        let text = String::from_utf8_lossy(&out.buffer);
        assert!(!text.contains("Connection failed"));
        assert_eq!(store.database().count_connection_tests().expect("count"), 0);
    }

    #[test]
    fn summary_requires_single_deployment() {
        let same = summarize(vec![passed("web", "d"), passed("mcp", "d")]);
        assert!(same.passed);
        assert_eq!(same.exit_code(), 0);

        let split = summarize(vec![passed("web", "d1"), passed("mcp", "d2")]);
        assert!(!split.passed);
        assert_eq!(split.deployment_ids, vec!["d1", "d2"]);

        assert!(!summarize(Vec::new()).passed);
    }

    #[test]
    fn local_time_formatting_falls_back_to_raw_value() {
        assert_eq!(format_local_time(i64::MAX), i64::MAX.to_string());
        assert_eq!(format_local_time(0).len(), "1970-01-01 00:00:00".len());
    }
}
