//! Environment-driven client configuration

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = ".todo-data";
const DEFAULT_CATEGORIZER_URL: &str = "http://localhost:5001";
const DEFAULT_CATEGORIZER_TIMEOUT_MS: u64 = 5000;
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_LOCAL_USER: &str = "local";

/// How the user signs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityConfig {
    Github { api_url: String, token: String },
    Local { uid: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    pub categorizer_url: String,
    pub categorizer_timeout: Duration,
    pub identity: IdentityConfig,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let identity = match value("GITHUB_TOKEN") {
            Some(token) => IdentityConfig::Github {
                api_url: value("GITHUB_API_URL")
                    .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
                token,
            },
            None => IdentityConfig::Local {
                uid: value("TODO_LOCAL_USER").unwrap_or_else(|| DEFAULT_LOCAL_USER.to_string()),
            },
        };

        let timeout_ms = value("TODO_CATEGORIZER_TIMEOUT_MS")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_CATEGORIZER_TIMEOUT_MS);

        Self {
            data_dir: value("TODO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            categorizer_url: value("TODO_CATEGORIZER_URL")
                .unwrap_or_else(|| DEFAULT_CATEGORIZER_URL.to_string()),
            categorizer_timeout: Duration::from_millis(timeout_ms),
            identity,
        }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }
}
