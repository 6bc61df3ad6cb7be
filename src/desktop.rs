use crate::config::BackendConfig;
use crate::db::Database;
use crate::errors::AppError;
use crate::models::{CleanupResponse, ConnectionStatus, DatabaseInfo, RecordTestPayload, RecordTestResponse};
use crate::logging::{env_filter, PANEL_LOG_FILTER};
use crate::panel::{run_panel_round, BadgeView, PanelResult, PanelView, StatusBadge, TestPanel};
use crate::store::{ConnectionStore, DEFAULT_CLEANUP_HOURS};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tauri::Manager;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

const PANEL_APP_ENV: &str = "CONNECTION_PANEL_APP";
const DEFAULT_PANEL_APP: &str = "web";

#[derive(Clone)]
struct AppState {
    store: Arc<ConnectionStore>,
    panel: Arc<Mutex<TestPanel>>,
}

impl AppState {
    fn panel(&self) -> Result<std::sync::MutexGuard<'_, TestPanel>, String> {
        self.panel.lock().map_err(|_| "panel state poisoned".to_string())
    }
}

#[tauri::command]
async fn run_connection_test(
    state: tauri::State<'_, AppState>,
    show_details: Option<bool>,
) -> Result<PanelView, String> {
    let app_name = {
        let mut panel = state.panel()?;
        if !panel.begin() {
            return Err("a connection test is already running".to_string());
        }
        panel.app_name.clone()
    };

    let store = state.store.clone();
    let result = tauri::async_runtime::spawn_blocking(move || run_panel_round(store.as_ref(), &app_name))
        .await
        .unwrap_or_else(|error| PanelResult::Error {
            message: format!("connection test task failed: {}", error),
        });

    let mut panel = state.panel()?;
    panel.finish(result);
    Ok(panel.view(show_details.unwrap_or(true)))
}

#[tauri::command]
fn panel_state(state: tauri::State<'_, AppState>, show_details: Option<bool>) -> Result<PanelView, String> {
    Ok(state.panel()?.view(show_details.unwrap_or(true)))
}

#[tauri::command]
fn record_connection_test(
    state: tauri::State<'_, AppState>,
    payload: RecordTestPayload,
) -> Result<RecordTestResponse, String> {
    state.store.record_test(payload).map_err(to_client_error)
}

#[tauri::command]
fn get_connection_status(
    state: tauri::State<'_, AppState>,
    app_name: Option<String>,
) -> Result<ConnectionStatus, String> {
    state
        .store
        .get_connection_status(app_name.as_deref())
        .map_err(to_client_error)
}

#[tauri::command]
fn get_database_info(state: tauri::State<'_, AppState>) -> Result<DatabaseInfo, String> {
    Ok(state.store.get_database_info())
}

#[tauri::command]
fn cleanup_test_records(
    state: tauri::State<'_, AppState>,
    older_than_hours: Option<f64>,
) -> Result<CleanupResponse, String> {
    state
        .store
        .cleanup_test_records(older_than_hours)
        .map_err(to_client_error)
}

#[tauri::command]
fn connection_badge(state: tauri::State<'_, AppState>) -> Result<BadgeView, String> {
    let app_name = state.panel()?.app_name.clone();
    let status = match state.store.get_connection_status(None) {
        Ok(status) => Some(status),
        Err(error) => {
            tracing::warn!(error = %error, "badge status query failed");
            None
        }
    };
    Ok(StatusBadge::from_status(status.as_ref(), &app_name).view())
}

pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
            std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
            init_tracing(&app_data_dir).map_err(|error| error.to_string())?;

            let root = std::env::current_dir().map_err(|error| error.to_string())?;
            let config = BackendConfig::load(&root).map_err(|error| error.to_string())?;
            let db = Database::new(&config.database_path(&root).map_err(|error| error.to_string())?)
                .map_err(|error| error.to_string())?;
            let store = Arc::new(ConnectionStore::new(Arc::new(db), config.deployment_id.as_deref()));

            let app_name = std::env::var(PANEL_APP_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PANEL_APP.to_string());
            tracing::info!(app = %app_name, deployment = %store.deployment_id(), "connection panel started");

            tauri::async_runtime::spawn({
                let store = store.clone();
                async move {
                    let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
                    loop {
                        interval.tick().await;
                        if let Err(error) = store.cleanup_test_records(Some(DEFAULT_CLEANUP_HOURS)) {
                            tracing::warn!(error = %error, "connection test cleanup failed");
                        }
                    }
                }
            });

            app.manage(AppState {
                store,
                panel: Arc::new(Mutex::new(TestPanel::new(app_name))),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            run_connection_test,
            panel_state,
            record_connection_test,
            get_connection_status,
            get_database_info,
            cleanup_test_records,
            connection_badge
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}

fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "connection-panel.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(PANEL_LOG_FILTER))
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

fn to_client_error(error: AppError) -> String {
    tracing::warn!(error = %error, "connection panel command failed");
    error.to_string()
}
