use crate::models::{EnvCheckReport, EnvFileReport, EnvFileState};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

pub const URL_KEY: &str = "CONVEX_URL";
pub const DEPLOYMENT_KEY: &str = "CONVEX_DEPLOYMENT";
pub const ENV_FILE_NAME: &str = ".env.local";

static ENV_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:export[ \t]+)?([A-Za-z_][A-Za-z0-9_]*)[ \t]*=(.*)$").expect("valid env line regex")
});

/// Value of the first `KEY=value` line for `key`. Blank values count as absent.
pub fn extract_env_value(content: &str, key: &str) -> Option<String> {
    ENV_LINE_RE
        .captures_iter(content)
        .find(|captures| &captures[1] == key)
        .map(|captures| unquote(captures[2].trim()).to_string())
        .filter(|value| !value.is_empty())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Shared root file first (once per app), then one file per app.
pub fn candidate_env_files(apps: &[&str]) -> Vec<String> {
    apps.iter()
        .map(|_| ENV_FILE_NAME.to_string())
        .chain(apps.iter().map(|app| format!("apps/{}/{}", app, ENV_FILE_NAME)))
        .collect()
}

pub fn check_environment_files(root: &Path, apps: &[&str]) -> EnvCheckReport {
    let mut configs: BTreeSet<(String, String)> = BTreeSet::new();
    let mut files = Vec::new();

    for relative in candidate_env_files(apps) {
        let state = match std::fs::read_to_string(root.join(&relative)) {
            Ok(content) => match (
                extract_env_value(&content, URL_KEY),
                extract_env_value(&content, DEPLOYMENT_KEY),
            ) {
                (Some(url), Some(deployment)) => {
                    configs.insert((url, deployment.clone()));
                    EnvFileState::Ok { deployment }
                }
                _ => EnvFileState::Missing,
            },
            Err(error) => {
                tracing::debug!(path = %relative, error = %error, "env file unreadable");
                EnvFileState::Unreadable {
                    reason: error.to_string(),
                }
            }
        };
        files.push(EnvFileReport { path: relative, state });
    }

    EnvCheckReport {
        files,
        distinct_configs: configs.len(),
        consistent: configs.len() == 1,
    }
}
