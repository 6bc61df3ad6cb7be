use crate::env_check::{extract_env_value, DEPLOYMENT_KEY, ENV_FILE_NAME, URL_KEY};
use crate::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Apps whose env files and connections are verified, in run order.
pub const WORKSPACE_APPS: [&str; 3] = ["web", "mcp", "docs"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub deployment_id: Option<String>,
}

impl BackendConfig {
    /// Process environment wins; the root `.env.local` fills whatever is unset.
    pub fn load(root: &Path) -> AppResult<Self> {
        let file_content = std::fs::read_to_string(root.join(ENV_FILE_NAME)).ok();
        Self::from_sources(
            |key| std::env::var(key).ok(),
            file_content.as_deref().unwrap_or_default(),
        )
    }

    pub fn from_sources(env: impl Fn(&str) -> Option<String>, file_content: &str) -> AppResult<Self> {
        let lookup = |key: &str| {
            env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .or_else(|| extract_env_value(file_content, key))
        };

        let url = lookup(URL_KEY).ok_or_else(|| AppError::Config(format!("{} not found in environment variables", URL_KEY)))?;
        Ok(Self {
            url,
            deployment_id: lookup(DEPLOYMENT_KEY),
        })
    }

    pub fn database_path(&self, root: &Path) -> AppResult<PathBuf> {
        resolve_database_path(&self.url, root)
    }
}

/// Maps a backend URL onto the SQLite file it names.
pub fn resolve_database_path(url: &str, root: &Path) -> AppResult<PathBuf> {
    let trimmed = url.trim();
    let raw = if let Some(rest) = trimmed.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("file://") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("file:") {
        rest
    } else if trimmed.contains("://") {
        return Err(AppError::Config(format!("unsupported backend url '{}'", trimmed)));
    } else {
        trimmed
    };

    if raw.is_empty() {
        return Err(AppError::Config("backend url has no database path".to_string()));
    }

    let path = PathBuf::from(raw);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_database_path, BackendConfig};
    use crate::errors::AppError;
    use std::collections::HashMap;
    use std::path::Path;

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([("CONVEX_URL", "sqlite://from-env.db")]);
        let config = BackendConfig::from_sources(
            |key| env.get(key).map(|value| value.to_string()),
            "CONVEX_URL=sqlite://from-file.db\nCONVEX_DEPLOYMENT=dev:otter\n",
        )
        .expect("config");
        assert_eq!(config.url, "sqlite://from-env.db");
        assert_eq!(config.deployment_id.as_deref(), Some("dev:otter"));
    }

    #[test]
    fn missing_url_is_config_error() {
        let error = BackendConfig::from_sources(|_| None, "CONVEX_DEPLOYMENT=dev:otter\n").expect_err("missing url");
        assert!(matches!(error, AppError::Config(_)));
        assert!(error.to_string().contains("CONVEX_URL not found"));
    }

    #[test]
    fn resolves_supported_url_forms() {
        let root = Path::new("/workspace");
        assert_eq!(
            resolve_database_path("sqlite://data/links.db", root).expect("relative sqlite"),
            root.join("data/links.db")
        );
        assert_eq!(
            resolve_database_path("file:///var/db/links.db", root).expect("absolute file"),
            Path::new("/var/db/links.db")
        );
        assert_eq!(resolve_database_path("links.db", root).expect("bare"), root.join("links.db"));
        assert!(resolve_database_path("https://happy-otter-123.convex.cloud", root).is_err());
        assert!(resolve_database_path("sqlite://", root).is_err());
    }
}
