use std::path::PathBuf;

use crate::{
    ChainId, Failure, LogEntry, NoticeAction, Page, Project, ProjectId, ProjectStatus, Route,
    Settings, UploadFile, UploadKind, ViewId,
};

/// A single draft field edit on the settings screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsField {
    Username(String),
    Password(String),
    Config(String),
}

/// A single draft field edit on the project screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectField {
    Name(String),
    ProfileId(String),
    Notes(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Enter a route, tearing down the current view.
    Navigate(Route),
    /// Re-enter the current route with fresh state.
    Reload,
    /// Return to the previous route.
    BackClicked,
    NewProjectClicked,
    SettingsClicked,
    /// The user picked the action button of the visible notice.
    NoticeActionInvoked(NoticeAction),

    SettingsLoaded {
        view: ViewId,
        result: Result<Settings, Failure>,
    },
    SettingsEdited(SettingsField),
    SaveSettingsClicked,
    SettingsSaved {
        view: ViewId,
        result: Result<Settings, Failure>,
    },

    ProjectsLoaded {
        view: ViewId,
        result: Result<Page<Project>, Failure>,
    },
    NextPageClicked,
    PreviousPageClicked,
    EditProjectClicked {
        project_id: ProjectId,
    },
    DeleteProjectClicked {
        project_id: ProjectId,
    },
    ProjectDeleted {
        view: ViewId,
        project_id: ProjectId,
        result: Result<(), Failure>,
    },

    CreateProjectClicked {
        name: String,
        profile_id: String,
    },
    /// Outcome of the OAuth consent step; the error text is shown verbatim.
    AuthorizationFinished {
        view: ViewId,
        result: Result<String, String>,
    },
    ProjectCreated {
        view: ViewId,
        result: Result<Project, Failure>,
    },

    ProjectLoaded {
        view: ViewId,
        result: Result<Project, Failure>,
    },
    PollTick {
        view: ViewId,
        chain: ChainId,
    },
    StatusFetched {
        view: ViewId,
        chain: ChainId,
        result: Result<ProjectStatus, Failure>,
    },
    StartRunClicked,
    RunStarted {
        view: ViewId,
        result: Result<(), Failure>,
    },
    CancelRunClicked,
    RunCancelled {
        view: ViewId,
        result: Result<(), Failure>,
    },
    ProjectEdited(ProjectField),
    SaveProjectClicked,
    ProjectUpdated {
        view: ViewId,
        result: Result<Project, Failure>,
    },
    RemoveFeedClicked,
    RemoveAssetClicked {
        key: String,
    },
    DownloadFeedClicked,
    FeedDownloaded {
        view: ViewId,
        result: Result<PathBuf, Failure>,
    },
    FeedFileAdded(UploadFile),
    AssetFilesAdded(Vec<UploadFile>),
    AssetUploadUrlFetched {
        view: ViewId,
        result: Result<String, Failure>,
    },
    UploadFinished {
        view: ViewId,
        kind: UploadKind,
        file_name: String,
        result: Result<(), Failure>,
    },
    SheetUrlSubmitted(String),
    SheetExported {
        view: ViewId,
        url: String,
        result: Result<String, Failure>,
    },
    ShowLogClicked,

    /// `chain` is `None` for the initial load of the view.
    LogFetched {
        view: ViewId,
        chain: Option<ChainId>,
        result: Result<Page<LogEntry>, Failure>,
    },

    /// UI/render tick to coalesce rendering.
    Tick,
    NoOp,
}
