//! Backend payloads as the REST API serializes them (camelCase JSON).

use serde::{Deserialize, Serialize};

pub type ProjectId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Initialized,
    Running,
    Cancelled,
    Error,
    Completed,
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    /// No further progress is expected once a run lands here.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Error)
    }

    pub fn is_known_non_terminal(self) -> bool {
        matches!(
            self,
            ProjectStatus::Initialized | ProjectStatus::Running | ProjectStatus::Cancelled
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ProjectStatus::Initialized => "INITIALIZED",
            ProjectStatus::Running => "RUNNING",
            ProjectStatus::Cancelled => "CANCELLED",
            ProjectStatus::Error => "ERROR",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Unknown => "UNKNOWN",
        }
    }
}

/// A blob the backend holds for a project (feed or asset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub key: String,
    #[serde(default)]
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sheets_feed_url: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub feed: Option<StoredFile>,
    #[serde(default)]
    pub assets: Vec<StoredFile>,
    #[serde(default)]
    pub feed_upload_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_run_at: Option<String>,
    #[serde(default)]
    pub last_completed_at: Option<String>,
}

/// Body of `POST /api/projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub profile_id: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Opaque to the client; the backend stores a JSON document here.
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogSeverity {
    Fatal,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
    Trace,
    #[serde(other)]
    Unknown,
}

impl LogSeverity {
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Fatal => "FATAL",
            LogSeverity::Error => "ERROR",
            LogSeverity::Warning => "WARNING",
            LogSeverity::Info => "INFO",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Trace => "TRACE",
            LogSeverity::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    #[serde(default)]
    pub project_id: ProjectId,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub severity: LogSeverity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One page of a cursor-paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub entities: Vec<T>,
    #[serde(default)]
    pub has_previous: bool,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub previous_cursor: Option<String>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            has_previous: false,
            has_next: false,
            previous_cursor: None,
            next_cursor: None,
        }
    }
}

impl<T> Page<T> {
    pub fn next(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// Body of `GET /api/projects/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: ProjectStatus,
}

/// Body of `GET /api/projects/{id}/asset_upload_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub upload_url: String,
}

/// What went wrong with an IO effect, reduced to what the UI needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub class: FailureClass,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transport,
    Http(u16),
    Unauthorized,
    Invalid,
}

impl Failure {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
