use crate::{LogEntry, LogSeverity, Project, ProjectId, ProjectStatus, Settings, ViewId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub view_id: ViewId,
    pub path: String,
    pub screen: ScreenView,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScreenView {
    #[default]
    Blank,
    Settings(SettingsScreen),
    Projects(ProjectsScreen),
    NewProject {
        name: String,
        profile_id: String,
        saving: bool,
    },
    Edit(Box<EditScreen>),
    Log(LogScreen),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsScreen {
    pub draft: Option<Settings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectsScreen {
    pub loaded: bool,
    pub rows: Vec<ProjectRowView>,
    pub has_previous: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRowView {
    pub id: ProjectId,
    pub name: String,
    pub status: ProjectStatus,
    pub updated_at: Option<String>,
}

impl From<&Project> for ProjectRowView {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            status: project.status,
            updated_at: project.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditScreen {
    pub project_id: ProjectId,
    pub draft: Option<Project>,
    pub status: Option<ProjectStatus>,
    pub polls: u32,
    pub polling: bool,
    pub feed_queue: usize,
    pub asset_queue: usize,
    pub uploading: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogScreen {
    pub project_id: ProjectId,
    pub project_name: Option<String>,
    pub loaded: bool,
    pub entries: Vec<LogRowView>,
    pub has_previous: bool,
    pub has_next: bool,
    pub polling: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRowView {
    pub severity: LogSeverity,
    pub message: String,
    pub created_at: Option<String>,
}

impl From<&LogEntry> for LogRowView {
    fn from(entry: &LogEntry) -> Self {
        Self {
            severity: entry.severity,
            message: entry.message.clone(),
            created_at: entry.created_at.clone(),
        }
    }
}
