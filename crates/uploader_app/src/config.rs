use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uploader_core::PollSettings;
use uploader_engine::{BasicCredentials, ClientSettings, DriveSettings, DRIVE_API_BASE};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "uploader.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    /// Fetches per poll chain; 0 turns polling off.
    pub max_retries: u32,
    pub max_backoff_secs: u64,
    pub max_consecutive_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        let defaults = PollSettings::default();
        Self {
            interval_secs: defaults.interval.as_secs(),
            max_retries: defaults.max_retries,
            max_backoff_secs: defaults.max_backoff.as_secs(),
            max_consecutive_failures: defaults.max_consecutive_failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_download_bytes: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub poll: PollConfig,
    pub drive_api: String,
    pub drive_token: Option<String>,
    /// Skips the consent prompt when set.
    pub authorization_code: Option<String>,
    pub oauth_client_id: Option<String>,
    pub oauth_redirect_uri: String,
    pub authorization_wait_secs: u64,
    pub download_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            backend_url: client.base_url,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            max_download_bytes: client.max_download_bytes,
            username: None,
            password: None,
            poll: PollConfig::default(),
            drive_api: DRIVE_API_BASE.to_string(),
            drive_token: None,
            authorization_code: None,
            oauth_client_id: None,
            oauth_redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            authorization_wait_secs: 300,
            download_dir: PathBuf::from("downloads"),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or `./uploader.ron` when present, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&text).map_err(|message| ConfigError::Parse { path, message })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        ron::from_str(text).map_err(|err| err.to_string())
    }

    pub fn client_settings(&self) -> ClientSettings {
        let credentials = match (&self.username, &self.password) {
            (Some(username), password) => Some(BasicCredentials {
                username: username.clone(),
                password: password.clone().unwrap_or_default(),
            }),
            (None, _) => None,
        };
        ClientSettings {
            base_url: self.backend_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_download_bytes: self.max_download_bytes,
            credentials,
        }
    }

    pub fn drive_settings(&self) -> DriveSettings {
        DriveSettings {
            api_base: self.drive_api.clone(),
            access_token: self.drive_token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll.interval_secs.max(1)),
            max_retries: self.poll.max_retries,
            max_backoff: Duration::from_secs(self.poll.max_backoff_secs),
            max_consecutive_failures: self.poll.max_consecutive_failures.max(1),
        }
    }
}
