use crate::notice::{self, Notice};
use crate::view_model::{
    AppViewModel, EditScreen, LogRowView, LogScreen, ProjectRowView, ProjectsScreen, ScreenView,
    SettingsScreen,
};
use crate::{
    Effect, LogEntry, Page, PollSession, PollSettings, Project, ProjectId, ProjectStatus, Route,
    Settings, UploadQueue,
};

/// Identifies one entry into a route. Every async completion carries the
/// id of the view that asked for it; results for any other id are dropped.
pub type ViewId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    route: Route,
    view_id: ViewId,
    view: ViewState,
    history: Vec<Route>,
    poll: PollSettings,
    dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum ViewState {
    #[default]
    Blank,
    Settings(SettingsView),
    Projects(ProjectsView),
    NewProject(NewProjectView),
    Edit(Box<EditView>),
    Log(LogView),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct SettingsView {
    pub(crate) draft: Option<Settings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct ProjectsView {
    pub(crate) page: Option<Page<Project>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct NewProjectView {
    pub(crate) name: String,
    pub(crate) profile_id: String,
    pub(crate) saving: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EditView {
    pub(crate) project_id: ProjectId,
    pub(crate) project: Option<Project>,
    pub(crate) draft: Option<Project>,
    /// Last status reported by the status poll; `None` until the first poll lands.
    pub(crate) status: Option<ProjectStatus>,
    pub(crate) poll: PollSession,
    pub(crate) feed_uploads: UploadQueue,
    pub(crate) asset_uploads: UploadQueue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogView {
    pub(crate) project_id: ProjectId,
    pub(crate) cursor: Option<String>,
    pub(crate) page: Option<Page<LogEntry>>,
    pub(crate) project_name: Option<String>,
    pub(crate) poll: PollSession,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_settings(poll: PollSettings) -> Self {
        Self {
            poll,
            ..Self::default()
        }
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn poll_settings(&self) -> &PollSettings {
        &self.poll
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_live(&self, view: ViewId) -> bool {
        view == self.view_id && !matches!(self.view, ViewState::Blank)
    }

    pub(crate) fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub(crate) fn view_state_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub(crate) fn pop_history(&mut self) -> Option<Route> {
        self.history.pop()
    }

    /// Tears down the current view and enters `route` with fresh state.
    /// `remember` pushes the outgoing route onto the back stack.
    pub(crate) fn enter(&mut self, route: Route, remember: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        if matches!(self.view, ViewState::Edit(_) | ViewState::Log(_)) {
            effects.push(Effect::CancelPoll { view: self.view_id });
        }
        if remember && !matches!(self.view, ViewState::Blank) {
            self.history.push(self.route.clone());
        }

        self.view_id += 1;
        let view = self.view_id;
        self.route = route.clone();
        self.dirty = true;

        let loading = Effect::ShowNotice(Notice::text(notice::LOADING));
        self.view = match route {
            Route::Settings => {
                effects.extend([loading, Effect::FetchSettings { view }]);
                ViewState::Settings(SettingsView::default())
            }
            Route::Projects => {
                effects.extend([loading, Effect::FetchProjects { view, cursor: None }]);
                ViewState::Projects(ProjectsView::default())
            }
            Route::ProjectsPage { cursor } => {
                effects.extend([
                    loading,
                    Effect::FetchProjects {
                        view,
                        cursor: Some(cursor),
                    },
                ]);
                ViewState::Projects(ProjectsView::default())
            }
            Route::NewProject => ViewState::NewProject(NewProjectView::default()),
            Route::EditProject { id } => {
                effects.extend([loading, Effect::FetchProject { view, project_id: id }]);
                ViewState::Edit(Box::new(EditView {
                    project_id: id,
                    project: None,
                    draft: None,
                    status: None,
                    poll: PollSession::default(),
                    feed_uploads: UploadQueue::feed(),
                    asset_uploads: UploadQueue::assets(),
                }))
            }
            Route::ProjectLog { id, cursor } => {
                effects.extend([
                    loading,
                    Effect::FetchLog {
                        view,
                        chain: None,
                        project_id: id,
                        cursor: cursor.clone(),
                    },
                ]);
                ViewState::Log(LogView {
                    project_id: id,
                    cursor,
                    page: None,
                    project_name: None,
                    poll: PollSession::default(),
                })
            }
        };
        effects
    }

    pub fn view(&self) -> AppViewModel {
        let screen = match &self.view {
            ViewState::Blank => ScreenView::Blank,
            ViewState::Settings(s) => ScreenView::Settings(SettingsScreen {
                draft: s.draft.clone(),
            }),
            ViewState::Projects(p) => {
                let page = p.page.as_ref();
                ScreenView::Projects(ProjectsScreen {
                    loaded: page.is_some(),
                    rows: page
                        .map(|page| page.entities.iter().map(ProjectRowView::from).collect())
                        .unwrap_or_default(),
                    has_previous: page.is_some_and(|page| page.has_previous),
                    has_next: page.is_some_and(|page| page.has_next),
                })
            }
            ViewState::NewProject(n) => ScreenView::NewProject {
                name: n.name.clone(),
                profile_id: n.profile_id.clone(),
                saving: n.saving,
            },
            ViewState::Edit(e) => ScreenView::Edit(Box::new(EditScreen {
                project_id: e.project_id,
                draft: e.draft.clone(),
                status: e.status,
                polls: e.poll.retries(),
                polling: e.poll.is_active(),
                feed_queue: e.feed_uploads.len(),
                asset_queue: e.asset_uploads.len(),
                uploading: e
                    .feed_uploads
                    .active()
                    .or_else(|| e.asset_uploads.active())
                    .map(|f| f.name.clone()),
            })),
            ViewState::Log(l) => {
                let page = l.page.as_ref();
                ScreenView::Log(LogScreen {
                    project_id: l.project_id,
                    project_name: l.project_name.clone(),
                    loaded: page.is_some(),
                    entries: page
                        .map(|page| page.entities.iter().map(LogRowView::from).collect())
                        .unwrap_or_default(),
                    has_previous: page.is_some_and(|page| page.has_previous),
                    has_next: page.is_some_and(|page| page.has_next),
                    polling: l.poll.is_active(),
                })
            }
        };

        AppViewModel {
            view_id: self.view_id,
            path: self.route.path(),
            screen,
            dirty: self.dirty,
        }
    }
}
