use std::time::Duration;

use crate::{
    ChainId, NewProject, Notice, Project, ProjectId, Settings, UploadFile, UploadKind, ViewId,
};

/// IO the runtime must perform on behalf of `update`. Completions come back
/// as `Msg`s carrying the same `view` so stale results can be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowNotice(Notice),
    HideNotice,
    FetchSettings {
        view: ViewId,
    },
    SaveSettings {
        view: ViewId,
        settings: Settings,
    },
    FetchProjects {
        view: ViewId,
        cursor: Option<String>,
    },
    DeleteProject {
        view: ViewId,
        project_id: ProjectId,
    },
    RequestAuthorization {
        view: ViewId,
    },
    CreateProject {
        view: ViewId,
        project: NewProject,
    },
    FetchProject {
        view: ViewId,
        project_id: ProjectId,
    },
    UpdateProject {
        view: ViewId,
        project: Project,
    },
    FetchStatus {
        view: ViewId,
        chain: ChainId,
        project_id: ProjectId,
    },
    StartRun {
        view: ViewId,
        project_id: ProjectId,
    },
    CancelRun {
        view: ViewId,
        project_id: ProjectId,
    },
    FetchAssetUploadUrl {
        view: ViewId,
        project_id: ProjectId,
    },
    UploadFile {
        view: ViewId,
        kind: UploadKind,
        url: String,
        file: UploadFile,
    },
    DownloadFeed {
        view: ViewId,
        project_id: ProjectId,
        file_name: String,
    },
    ExportSheet {
        view: ViewId,
        sheet_id: String,
        url: String,
    },
    /// `chain` is `None` for the initial page load of a log view.
    FetchLog {
        view: ViewId,
        chain: Option<ChainId>,
        project_id: ProjectId,
        cursor: Option<String>,
    },
    /// Replaces any pending tick for `view`.
    SchedulePoll {
        view: ViewId,
        chain: ChainId,
        delay: Duration,
    },
    CancelPoll {
        view: ViewId,
    },
}
