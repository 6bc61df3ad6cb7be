use crate::db::NewConnectionTest;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ComprehensiveFailure, ComprehensiveReport, ComprehensiveSteps, CountStep, QueryStep, ReadStep,
    RoundDatabaseInfo, TestOutcome, WriteStep, COMPREHENSIVE_TEST_TYPE,
};
use crate::store::{validate_app_name, ConnectionStore};
use chrono::{SecondsFormat, Utc};

pub const QUERY_STEP_LIMIT: u32 = 5;

/// Runs write, read, query and count against the store for one app.
///
/// Errors never escape: any failing step ends the round and is reported as
/// `TestOutcome::Failed`. A write that already landed is left in place.
pub fn run_comprehensive_test(store: &ConnectionStore, app_name: &str) -> TestOutcome {
    let started_at = Utc::now();
    let timestamp = started_at.timestamp_millis();

    match run_steps(store, app_name, timestamp, &started_at.to_rfc3339_opts(SecondsFormat::Millis, true)) {
        Ok(tests) => TestOutcome::Passed(ComprehensiveReport {
            tests,
            database_info: RoundDatabaseInfo {
                deployment_id: store.deployment_id().to_string(),
                timestamp,
                app_name: app_name.to_string(),
            },
            message: "All database operations successful".to_string(),
        }),
        Err(error) => {
            tracing::warn!(app = %app_name, error = %error, "comprehensive connection test failed");
            TestOutcome::Failed(ComprehensiveFailure {
                error: error.to_string(),
                timestamp,
                app_name: app_name.to_string(),
            })
        }
    }
}

fn run_steps(
    store: &ConnectionStore,
    app_name: &str,
    timestamp: i64,
    started_at: &str,
) -> AppResult<ComprehensiveSteps> {
    validate_app_name(app_name)?;
    let db = store.database();
    let test_data = format!("Comprehensive test from {} at {}", app_name, started_at);

    let written = db.insert_connection_test(&NewConnectionTest {
        app_name,
        timestamp,
        test_data: Some(&test_data),
        test_type: Some(COMPREHENSIVE_TEST_TYPE),
    })?;

    let read = db.get_connection_test(&written.id)?.ok_or_else(|| {
        AppError::NotFound(format!("record {} not visible after write", written.id))
    })?;

    let recent = db.list_connection_tests_for_app(app_name, Some(QUERY_STEP_LIMIT))?;
    let all = db.list_connection_tests_for_app(app_name, None)?;

    Ok(ComprehensiveSteps {
        write: WriteStep {
            success: true,
            record_id: written.id,
        },
        read: ReadStep {
            success: true,
            data: read,
        },
        query: QueryStep {
            success: true,
            count: recent.len(),
        },
        count: CountStep {
            success: true,
            total: all.len(),
        },
    })
}
