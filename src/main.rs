use anyhow::Context;
use connection_check_lib::check::run_connection_check;
use connection_check_lib::config::{BackendConfig, WORKSPACE_APPS};
use connection_check_lib::db::Database;
use connection_check_lib::logging::{env_filter, CLI_LOG_FILTER};
use connection_check_lib::store::ConnectionStore;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(error = %format!("{:#}", error), "connection check aborted");
            eprintln!("💥 Test script failed: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let root = std::env::current_dir().context("failed to resolve workspace root")?;

    let config = match BackendConfig::load(&root) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("❌ {}", error);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut out = std::io::stdout().lock();
    writeln!(out, "🔍 Testing Convex Database Connection for all apps...")?;
    writeln!(out, "📡 Convex URL: {}\n", config.url)?;

    let db_path = config.database_path(&root)?;
    let db = Database::new(&db_path).with_context(|| format!("failed to open {}", db_path.display()))?;
    let store = ConnectionStore::new(Arc::new(db), config.deployment_id.as_deref());

    let summary = run_connection_check(&root, &store, &WORKSPACE_APPS, &mut out)?;
    out.flush()?;
    tracing::info!(passed = summary.passed, apps = summary.results.len(), "connection check finished");

    Ok(ExitCode::from(summary.exit_code() as u8))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(CLI_LOG_FILTER))
        .with_writer(std::io::stderr)
        .try_init();
}
