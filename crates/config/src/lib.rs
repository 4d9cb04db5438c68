use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use jira_lookup_auth::{AuthError, Credentials};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const ENV_JIRA_URL: &str = "JIRA_URL";
pub const ENV_JIRA_USERNAME: &str = "JIRA_USERNAME";
pub const ENV_JIRA_TOKEN: &str = "JIRA_TOKEN";
pub const ENV_BIND: &str = "JIRA_LOOKUP_BIND";
pub const ENV_TIMEOUT_SECS: &str = "JIRA_LOOKUP_TIMEOUT_SECS";
pub const ENV_CONCURRENCY: &str = "JIRA_LOOKUP_CONCURRENCY";

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting `{key}` (set it in the config file or via {env})")]
    Missing {
        key: &'static str,
        env: &'static str,
    },

    #[error("Invalid base URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid value for `{key}`: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Invalid credentials: {0}")]
    Credentials(#[from] AuthError),
}

/// Raw configuration as read from disk. Every field is optional so the
/// environment can fill in what the file leaves out.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub fetch: FetchSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JiraSection {
    pub url: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerSection {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FetchSection {
    pub timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
}

impl Config {
    /// Load configuration from the provided path or the default config file.
    /// A missing file yields an empty configuration.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "No config file found, relying on environment");
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;

        serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))
    }

    /// Overlay values from the environment. Blank variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = var(ENV_JIRA_URL) {
            self.jira.url = Some(url);
        }
        if let Some(username) = var(ENV_JIRA_USERNAME) {
            self.jira.username = Some(username);
        }
        if let Some(token) = var(ENV_JIRA_TOKEN) {
            self.jira.token = Some(token);
        }
        if let Some(bind) = var(ENV_BIND) {
            self.server.bind = Some(bind);
        }
        if let Some(raw) = var(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "fetch.timeout_secs",
                    message: format!("`{raw}` is not a whole number of seconds"),
                })?;
            self.fetch.timeout_secs = Some(secs);
        }
        if let Some(raw) = var(ENV_CONCURRENCY) {
            let concurrency = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "fetch.concurrency",
                    message: format!("`{raw}` is not a positive integer"),
                })?;
            self.fetch.concurrency = Some(concurrency);
        }

        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_process_env(&mut self) -> std::result::Result<(), ConfigError> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Validate and freeze the configuration into [`Settings`].
    pub fn resolve(&self) -> std::result::Result<Settings, ConfigError> {
        let base_url = self
            .jira
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing {
                key: "jira.url",
                env: ENV_JIRA_URL,
            })?;
        validate_base_url(base_url)?;

        let username = self.jira.username.clone().ok_or(ConfigError::Missing {
            key: "jira.username",
            env: ENV_JIRA_USERNAME,
        })?;
        let token = self.jira.token.clone().ok_or(ConfigError::Missing {
            key: "jira.token",
            env: ENV_JIRA_TOKEN,
        })?;
        let credentials = Credentials::new(username, token)?;

        let bind_raw = self.server.bind.as_deref().unwrap_or(DEFAULT_BIND);
        let bind = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "server.bind",
                message: format!("`{bind_raw}`: {e}"),
            })?;

        let timeout_secs = self.fetch.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch.timeout_secs",
                message: "must be at least 1".to_string(),
            });
        }

        let concurrency = self.fetch.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch.concurrency",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Settings {
            upstream: UpstreamSettings {
                base_url: base_url.to_string(),
                credentials,
                timeout: Duration::from_secs(timeout_secs),
            },
            bind,
            concurrency,
        })
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".jira-lookup");
        path.push("config.yaml");
        path
    }
}

fn validate_base_url(raw: &str) -> std::result::Result<(), ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

/// Validated, immutable process settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub upstream: UpstreamSettings,
    pub bind: SocketAddr,
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Issue keys are appended to this verbatim.
    pub base_url: String,
    pub credentials: Credentials,
    pub timeout: Duration,
}
