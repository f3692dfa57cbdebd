//! Uploader core: pure state machine, routing and view-model helpers.
mod effect;
mod model;
mod msg;
pub mod notice;
mod poll;
mod route;
mod state;
mod update;
mod upload;
mod view_model;

pub use effect::Effect;
pub use model::{
    Failure, FailureClass, LogEntry, LogSeverity, NewProject, Page, Project, ProjectId,
    ProjectStatus, Settings, StatusReport, StoredFile, UploadTicket,
};
pub use msg::{Msg, ProjectField, SettingsField};
pub use notice::{Notice, NoticeAction};
pub use poll::{AfterFailure, ChainId, PollSession, PollSettings};
pub use route::Route;
pub use state::{AppState, ViewId};
pub use update::update;
pub use upload::{
    sheet_id_from_url, EnqueueRejection, FileSource, UploadFile, UploadKind, UploadQueue,
    CSV_MIME,
};
pub use view_model::{
    AppViewModel, EditScreen, LogRowView, LogScreen, ProjectRowView, ProjectsScreen, ScreenView,
    SettingsScreen,
};
