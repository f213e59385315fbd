use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const TOKEN_ENV: &str = "PAGERDUTY_API_TOKEN";

/// Contents of `<config dir>/pagerduty-mcp/config.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub api_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(
        "No PagerDuty API token found. Set {}, pass --token, or write {{\"api_token\": \"...\"}} to {}",
        TOKEN_ENV,
        config_path().display()
    )]
    MissingToken,
    #[error("Invalid PagerDuty API URL '{url}': {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl StartupError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidApiUrl { .. } => "invalid_api_url",
            Self::HttpClient(_) => "http_client_error",
        }
    }
}

pub fn client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(format!("pagerduty-mcp/{}", env!("CARGO_PKG_VERSION")))
        .build()
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagerduty-mcp")
        .join("config.json")
}

pub fn load_credentials() -> Option<StoredCredentials> {
    let data = std::fs::read_to_string(config_path()).ok()?;
    serde_json::from_str(&data).ok()
}

/// `--token` / `PAGERDUTY_API_TOKEN` first, then the stored config file.
pub fn resolve_token(explicit: Option<&str>) -> Result<String, StartupError> {
    let stored = load_credentials().map(|creds| creds.api_token);
    pick_token(explicit, stored)
}

fn pick_token(explicit: Option<&str>, stored: Option<String>) -> Result<String, StartupError> {
    explicit
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| stored.filter(|token| !token.trim().is_empty()))
        .ok_or(StartupError::MissingToken)
}
