use tracing_subscriber::EnvFilter;

/// Library events at `info`, dependencies only when they warn.
pub const PANEL_LOG_FILTER: &str = "connection_check_lib=info,warn";
/// The CLI report owns stdout; stderr logging stays quiet unless asked.
pub const CLI_LOG_FILTER: &str = "connection_check_lib=warn,connection_check=warn,error";

/// `RUST_LOG` wins when it parses; otherwise `fallback` applies.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|error| {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            eprintln!("ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, error);
        }
        EnvFilter::new(fallback)
    })
}
