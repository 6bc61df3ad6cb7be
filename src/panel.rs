use crate::backend::ConnectionBackend;
use crate::check::format_local_time;
use crate::models::{ConnectionStatus, TestOutcome};
use serde::{Deserialize, Serialize};

/// What the panel shows after a test click: the round outcome, or the error
/// raised by the call itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum PanelResult {
    Outcome(TestOutcome),
    Error { message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPanel {
    pub app_name: String,
    pub loading: bool,
    pub result: Option<PanelResult>,
}

impl TestPanel {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            loading: false,
            result: None,
        }
    }

    /// Returns false while a test is already outstanding.
    pub fn begin(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        self.result = None;
        true
    }

    pub fn finish(&mut self, result: PanelResult) {
        self.loading = false;
        self.result = Some(result);
    }

    pub fn button_label(&self) -> &'static str {
        if self.loading {
            "Testing..."
        } else {
            "Run Connection Test"
        }
    }

    pub fn render_lines(&self, show_details: bool) -> Vec<String> {
        match &self.result {
            None => Vec::new(),
            Some(result) => render_panel_result(result, show_details),
        }
    }

    /// Snapshot handed to the window; the UI only prints these strings.
    pub fn view(&self, show_details: bool) -> PanelView {
        PanelView {
            app_name: self.app_name.clone(),
            loading: self.loading,
            button_label: self.button_label().to_string(),
            success: self.result.as_ref().map(PanelResult::success),
            lines: self.render_lines(show_details),
        }
    }
}

impl PanelResult {
    pub fn success(&self) -> bool {
        matches!(self, Self::Outcome(outcome) if outcome.success())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub app_name: String,
    pub loading: bool,
    pub button_label: String,
    pub success: Option<bool>,
    pub lines: Vec<String>,
}

/// One click's backend call. A backend error becomes `PanelResult::Error`.
pub fn run_panel_round(backend: &dyn ConnectionBackend, app_name: &str) -> PanelResult {
    match backend.run_comprehensive_test(app_name) {
        Ok(outcome) => PanelResult::Outcome(outcome),
        Err(error) => {
            tracing::warn!(app = %app_name, error = %error, "panel connection test failed");
            PanelResult::Error {
                message: error.to_string(),
            }
        }
    }
}

pub fn render_panel_result(result: &PanelResult, show_details: bool) -> Vec<String> {
    match result {
        PanelResult::Error { message } => vec![format!("Error: {}", message)],
        PanelResult::Outcome(TestOutcome::Failed(failure)) => vec![
            "Status: ✗ Failed".to_string(),
            format!("Error: {}", failure.error),
        ],
        PanelResult::Outcome(TestOutcome::Passed(report)) => {
            let mut lines = vec![
                "Status: ✓ Success".to_string(),
                format!("Deployment: {}", report.database_info.deployment_id),
                format!("Timestamp: {}", format_local_time(report.database_info.timestamp)),
            ];
            if show_details {
                lines.push("Test Details:".to_string());
                lines.extend(
                    report
                        .tests
                        .flags()
                        .iter()
                        .map(|(name, ok)| format!("{}: {}", name, if *ok { "✓" } else { "✗" })),
                );
            }
            lines
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StatusBadge {
    Loading,
    Connected { total_apps: usize },
    NotConnected,
}

impl StatusBadge {
    pub fn from_status(status: Option<&ConnectionStatus>, app_name: &str) -> Self {
        let Some(status) = status else {
            return Self::Loading;
        };
        if status.connected_apps.iter().any(|app| app == app_name) {
            Self::Connected {
                total_apps: status.connected_apps.len(),
            }
        } else {
            Self::NotConnected
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Loading => "Loading...".to_string(),
            Self::Connected { total_apps } => format!("Connected ({} apps)", total_apps),
            Self::NotConnected => "Not Connected".to_string(),
        }
    }

    pub fn view(self) -> BadgeView {
        BadgeView {
            label: self.label(),
            badge: self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    pub badge: StatusBadge,
    pub label: String,
}
