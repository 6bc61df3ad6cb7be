use serde::{Deserialize, Serialize};

pub const COMPREHENSIVE_TEST_TYPE: &str = "comprehensive";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestRecord {
    pub id: String,
    pub app_name: String,
    pub timestamp: i64,
    pub test_data: Option<String>,
    pub created_at: String,
    pub test_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTestPayload {
    pub app_name: String,
    pub timestamp: i64,
    pub test_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTestResponse {
    pub success: bool,
    pub record_id: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub success: bool,
    pub total_tests: usize,
    pub connected_apps: Vec<String>,
    pub last_test: Option<ConnectionTestRecord>,
    pub app_specific_test: Option<ConnectionTestRecord>,
    pub deployment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub deleted_count: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub deployment_id: String,
    pub timestamp: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteStep {
    pub success: bool,
    pub record_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadStep {
    pub success: bool,
    pub data: ConnectionTestRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStep {
    pub success: bool,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountStep {
    pub success: bool,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveSteps {
    pub write: WriteStep,
    pub read: ReadStep,
    pub query: QueryStep,
    pub count: CountStep,
}

impl ComprehensiveSteps {
    pub fn step_count(&self) -> usize {
        self.flags().len()
    }

    pub fn flags(&self) -> [(&'static str, bool); 4] {
        [
            ("Write", self.write.success),
            ("Read", self.read.success),
            ("Query", self.query.success),
            ("Count", self.count.success),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundDatabaseInfo {
    pub deployment_id: String,
    pub timestamp: i64,
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveReport {
    pub tests: ComprehensiveSteps,
    pub database_info: RoundDatabaseInfo,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveFailure {
    pub error: String,
    pub timestamp: i64,
    pub app_name: String,
}

/// Result of one write/read/query/count round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TestOutcome {
    Passed(ComprehensiveReport),
    Failed(ComprehensiveFailure),
}

impl TestOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Passed(_))
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Passed(report) => report.database_info.timestamp,
            Self::Failed(failure) => failure.timestamp,
        }
    }

    pub fn app_name(&self) -> &str {
        match self {
            Self::Passed(report) => &report.database_info.app_name,
            Self::Failed(failure) => &failure.app_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum EnvFileState {
    Ok { deployment: String },
    Missing,
    Unreadable { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvFileReport {
    pub path: String,
    pub state: EnvFileState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvCheckReport {
    pub files: Vec<EnvFileReport>,
    pub distinct_configs: usize,
    pub consistent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoundResult {
    pub app_name: String,
    pub success: bool,
    pub deployment_id: Option<String>,
    pub timestamp: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub env_consistent: bool,
    pub results: Vec<AppRoundResult>,
    pub deployment_ids: Vec<String>,
    pub passed: bool,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }
}
