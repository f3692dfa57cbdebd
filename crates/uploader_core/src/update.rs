use uploader_logging::{upl_debug, upl_info, upl_warn};

use crate::msg::{ProjectField, SettingsField};
use crate::notice::{self, Notice, NoticeAction};
use crate::state::{EditView, LogView, ViewState};
use crate::{
    sheet_id_from_url, AfterFailure, AppState, ChainId, Effect, EnqueueRejection, Failure, Msg,
    NewProject, PollSettings, ProjectStatus, Route, UploadFile, UploadKind, ViewId,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    if let Some(view) = completion_view(&msg) {
        if !state.is_live(view) {
            upl_debug!("dropping result addressed to disposed view {view}");
            return (state, Vec::new());
        }
    }

    let effects = match msg {
        Msg::Navigate(route) => state.enter(route, true),
        Msg::Reload => reload(&mut state),
        Msg::BackClicked => match state.pop_history() {
            Some(route) => state.enter(route, false),
            None => Vec::new(),
        },
        Msg::NewProjectClicked => state.enter(Route::NewProject, true),
        Msg::SettingsClicked => state.enter(Route::Settings, true),
        Msg::NoticeActionInvoked(NoticeAction::CancelRun) | Msg::CancelRunClicked => {
            request_cancel_run(&mut state)
        }

        Msg::SettingsLoaded { result, .. } => match result {
            Ok(settings) => {
                if let ViewState::Settings(view) = state.view_state_mut() {
                    view.draft = Some(settings);
                }
                state.mark_dirty();
                vec![Effect::HideNotice]
            }
            Err(failure) => report(&failure),
        },
        Msg::SettingsEdited(field) => {
            if let ViewState::Settings(view) = state.view_state_mut() {
                if let Some(draft) = view.draft.as_mut() {
                    match field {
                        SettingsField::Username(value) => draft.username = value,
                        SettingsField::Password(value) => draft.password = value,
                        SettingsField::Config(value) => {
                            draft.config = serde_json::Value::String(value)
                        }
                    }
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::SaveSettingsClicked => {
            let view = state.view_id();
            match state.view_state() {
                ViewState::Settings(s) => match &s.draft {
                    Some(draft) => vec![
                        Effect::ShowNotice(Notice::text(notice::SAVING)),
                        Effect::SaveSettings {
                            view,
                            settings: draft.clone(),
                        },
                    ],
                    None => Vec::new(),
                },
                _ => Vec::new(),
            }
        }
        Msg::SettingsSaved { result, .. } => match result {
            Ok(_) => with_hidden_notice(reload(&mut state)),
            Err(failure) => report(&failure),
        },

        Msg::ProjectsLoaded { result, .. } => match result {
            Ok(page) => {
                if let ViewState::Projects(view) = state.view_state_mut() {
                    view.page = Some(page);
                }
                state.mark_dirty();
                vec![Effect::HideNotice]
            }
            Err(failure) => report(&failure),
        },
        Msg::NextPageClicked => match next_page_route(&state) {
            Some(route) => state.enter(route, true),
            None => Vec::new(),
        },
        Msg::PreviousPageClicked => match previous_page_route(&state) {
            Some(route) => state.enter(route, true),
            None => Vec::new(),
        },
        Msg::EditProjectClicked { project_id } => {
            state.enter(Route::EditProject { id: project_id }, true)
        }
        Msg::DeleteProjectClicked { project_id } => match state.view_state() {
            ViewState::Projects(_) => vec![
                Effect::ShowNotice(Notice::text(notice::deleting(project_id))),
                Effect::DeleteProject {
                    view: state.view_id(),
                    project_id,
                },
            ],
            _ => Vec::new(),
        },
        Msg::ProjectDeleted {
            project_id, result, ..
        } => match result {
            Ok(()) => {
                if let ViewState::Projects(view) = state.view_state_mut() {
                    if let Some(page) = view.page.as_mut() {
                        if let Some(at) = page.entities.iter().position(|p| p.id == project_id) {
                            page.entities.remove(at);
                        }
                    }
                }
                state.mark_dirty();
                vec![Effect::HideNotice]
            }
            Err(failure) => report(&failure),
        },

        Msg::CreateProjectClicked { name, profile_id } => {
            let view = state.view_id();
            match state.view_state_mut() {
                ViewState::NewProject(form) if !form.saving => {
                    form.name = name;
                    form.profile_id = profile_id;
                    form.saving = true;
                    state.mark_dirty();
                    vec![
                        Effect::ShowNotice(Notice::text(notice::SAVING)),
                        Effect::RequestAuthorization { view },
                    ]
                }
                _ => Vec::new(),
            }
        }
        Msg::AuthorizationFinished { view, result } => match state.view_state_mut() {
            ViewState::NewProject(form) => match result {
                Ok(code) => vec![Effect::CreateProject {
                    view,
                    project: NewProject {
                        name: form.name.clone(),
                        profile_id: form.profile_id.clone(),
                        code,
                    },
                }],
                Err(message) => {
                    form.saving = false;
                    state.mark_dirty();
                    vec![Effect::ShowNotice(Notice::text(message))]
                }
            },
            _ => Vec::new(),
        },
        Msg::ProjectCreated { result, .. } => match result {
            Ok(project) => {
                upl_info!("created project {}", project.id);
                with_hidden_notice(state.enter(Route::EditProject { id: project.id }, true))
            }
            Err(failure) => {
                upl_warn!("project creation failed: {failure}");
                if let ViewState::NewProject(form) = state.view_state_mut() {
                    form.saving = false;
                }
                state.mark_dirty();
                vec![Effect::ShowNotice(Notice::text(notice::CREATE_FAILED))]
            }
        },

        Msg::ProjectLoaded { view, result } => match result {
            Ok(project) => {
                let poll = *state.poll_settings();
                let mut effects = vec![Effect::HideNotice];
                if let ViewState::Edit(edit) = state.view_state_mut() {
                    edit.draft = Some(project.clone());
                    edit.project = Some(project);
                    effects.extend(restart_status_chain(edit, &poll, view));
                }
                state.mark_dirty();
                effects
            }
            Err(failure) => report(&failure),
        },
        Msg::PollTick { view, chain } => {
            let poll = *state.poll_settings();
            match state.view_state_mut() {
                ViewState::Edit(edit) => {
                    if edit.poll.begin_tick(chain, &poll) {
                        vec![Effect::FetchStatus {
                            view,
                            chain,
                            project_id: edit.project_id,
                        }]
                    } else {
                        Vec::new()
                    }
                }
                ViewState::Log(log) => {
                    if log.poll.begin_tick(chain, &poll) {
                        vec![Effect::FetchLog {
                            view,
                            chain: Some(chain),
                            project_id: log.project_id,
                            cursor: log.cursor.clone(),
                        }]
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            }
        }
        Msg::StatusFetched {
            view,
            chain,
            result,
        } => status_fetched(&mut state, view, chain, result),
        Msg::StartRunClicked => {
            let view = state.view_id();
            match state.view_state() {
                ViewState::Edit(edit) if edit.project.is_some() => vec![Effect::StartRun {
                    view,
                    project_id: edit.project_id,
                }],
                _ => Vec::new(),
            }
        }
        Msg::RunStarted { view, result } => match result {
            Ok(()) => {
                let poll = *state.poll_settings();
                let mut effects = vec![Effect::ShowNotice(Notice::with_action(
                    notice::RUNNING,
                    NoticeAction::CancelRun,
                ))];
                if let ViewState::Edit(edit) = state.view_state_mut() {
                    edit.status = Some(ProjectStatus::Running);
                    effects.extend(restart_status_chain(edit, &poll, view));
                }
                state.mark_dirty();
                effects
            }
            Err(failure) => report(&failure),
        },
        Msg::RunCancelled { view, result } => match result {
            Ok(()) => {
                let poll = *state.poll_settings();
                let mut effects = Vec::new();
                if let ViewState::Edit(edit) = state.view_state_mut() {
                    effects.extend(restart_status_chain(edit, &poll, view));
                }
                effects.push(Effect::ShowNotice(Notice::text(notice::CANCELLING)));
                state.mark_dirty();
                effects
            }
            Err(failure) => report(&failure),
        },
        Msg::ProjectEdited(field) => {
            if let ViewState::Edit(edit) = state.view_state_mut() {
                if let Some(draft) = edit.draft.as_mut() {
                    match field {
                        ProjectField::Name(value) => draft.name = value,
                        ProjectField::ProfileId(value) => draft.profile_id = value,
                        ProjectField::Notes(value) => draft.notes = Some(value),
                    }
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::SaveProjectClicked => save_draft(&state),
        Msg::ProjectUpdated { view, result } => match result {
            Ok(_) => {
                let mut effects = vec![Effect::HideNotice];
                let held_feed = match state.view_state_mut() {
                    ViewState::Edit(edit) => start_feed_upload(edit, view),
                    _ => Vec::new(),
                };
                if held_feed.is_empty() {
                    effects.extend(reload(&mut state));
                } else {
                    state.mark_dirty();
                    effects.extend(held_feed);
                }
                effects
            }
            Err(failure) => report(&failure),
        },
        Msg::RemoveFeedClicked => {
            if let ViewState::Edit(edit) = state.view_state_mut() {
                if let Some(draft) = edit.draft.as_mut() {
                    draft.feed = None;
                }
            }
            save_draft(&state)
        }
        Msg::RemoveAssetClicked { key } => {
            if let ViewState::Edit(edit) = state.view_state_mut() {
                if let Some(draft) = edit.draft.as_mut() {
                    if let Some(at) = draft.assets.iter().position(|a| a.key == key) {
                        draft.assets.remove(at);
                    }
                }
            }
            save_draft(&state)
        }
        Msg::DownloadFeedClicked => {
            let view = state.view_id();
            match state.view_state() {
                ViewState::Edit(edit) => match edit.draft.as_ref().and_then(|d| d.feed.as_ref()) {
                    Some(feed) => vec![Effect::DownloadFeed {
                        view,
                        project_id: edit.project_id,
                        file_name: if feed.filename.is_empty() {
                            format!("feed-{}.csv", edit.project_id)
                        } else {
                            feed.filename.clone()
                        },
                    }],
                    None => Vec::new(),
                },
                _ => Vec::new(),
            }
        }
        Msg::FeedDownloaded { result, .. } => match result {
            Ok(path) => vec![Effect::ShowNotice(Notice::text(format!(
                "Feed saved to {}",
                path.display()
            )))],
            Err(failure) => report(&failure),
        },
        Msg::FeedFileAdded(file) => {
            let view = state.view_id();
            let effects = match state.view_state_mut() {
                ViewState::Edit(edit) if edit.draft.is_some() => {
                    match edit.feed_uploads.try_enqueue(file) {
                        Ok(()) => start_feed_upload(edit, view),
                        Err(EnqueueRejection::WrongType) => {
                            vec![Effect::ShowNotice(Notice::text(notice::FEED_NOT_CSV))]
                        }
                        Err(EnqueueRejection::QueueFull) => {
                            vec![Effect::ShowNotice(Notice::text(notice::FEED_BUSY))]
                        }
                    }
                }
                _ => Vec::new(),
            };
            state.mark_dirty();
            effects
        }
        Msg::AssetFilesAdded(files) => {
            let view = state.view_id();
            let effects = match state.view_state_mut() {
                ViewState::Edit(edit) if edit.draft.is_some() => {
                    let mut effects = Vec::new();
                    for file in files {
                        let name = file.name.clone();
                        if let Err(rejection) = edit.asset_uploads.try_enqueue(file) {
                            upl_warn!("asset {name} rejected: {rejection:?}");
                            effects.push(Effect::ShowNotice(Notice::text(format!(
                                "{name} was not queued."
                            ))));
                        }
                    }
                    effects.extend(start_asset_upload(edit, view));
                    effects
                }
                _ => Vec::new(),
            };
            state.mark_dirty();
            effects
        }
        Msg::AssetUploadUrlFetched { view, result } => match result {
            Ok(url) => match state.view_state() {
                ViewState::Edit(edit) => match edit.asset_uploads.active() {
                    Some(file) => vec![Effect::UploadFile {
                        view,
                        kind: UploadKind::Asset,
                        url,
                        file: file.clone(),
                    }],
                    None => Vec::new(),
                },
                _ => Vec::new(),
            },
            Err(failure) => {
                upl_warn!("could not obtain an asset upload url: {failure}");
                let file_name = match state.view_state() {
                    ViewState::Edit(edit) => edit.asset_uploads.active().map(|f| f.name.clone()),
                    _ => None,
                };
                match file_name {
                    Some(name) => finish_upload(&mut state, view, UploadKind::Asset, &name, false),
                    None => Vec::new(),
                }
            }
        },
        Msg::UploadFinished {
            view,
            kind,
            file_name,
            result,
        } => {
            if let Err(failure) = &result {
                upl_warn!("upload of {file_name} failed: {failure}");
            }
            finish_upload(&mut state, view, kind, &file_name, result.is_ok())
        }
        Msg::SheetUrlSubmitted(url) => {
            let view = state.view_id();
            match state.view_state() {
                ViewState::Edit(edit) if edit.draft.is_some() => match sheet_id_from_url(&url) {
                    Some(sheet_id) => vec![Effect::ExportSheet {
                        view,
                        sheet_id,
                        url: url.trim().to_string(),
                    }],
                    None => vec![Effect::ShowNotice(Notice::text(notice::BAD_SHEET_URL))],
                },
                _ => Vec::new(),
            }
        }
        Msg::SheetExported { url, result, .. } => match result {
            Ok(csv) => {
                let mut effects = Vec::new();
                if let ViewState::Edit(edit) = state.view_state_mut() {
                    if let Some(draft) = edit.draft.as_mut() {
                        draft.sheets_feed_url = Some(url);
                    }
                    // Held until the draft is saved; see `ProjectUpdated`.
                    if edit
                        .feed_uploads
                        .try_enqueue(UploadFile::csv("feed.csv", csv))
                        .is_err()
                    {
                        effects.push(Effect::ShowNotice(Notice::text(notice::FEED_BUSY)));
                    }
                }
                state.mark_dirty();
                effects.extend(save_draft(&state));
                effects
            }
            Err(failure) => vec![Effect::ShowNotice(Notice::text(failure.message))],
        },
        Msg::ShowLogClicked => {
            let project_id = match state.view_state() {
                ViewState::Edit(edit) => Some(edit.project_id),
                _ => None,
            };
            match project_id {
                Some(id) => state.enter(Route::ProjectLog { id, cursor: None }, true),
                None => Vec::new(),
            }
        }

        Msg::LogFetched {
            view,
            chain,
            result,
        } => {
            let stale = match state.view_state() {
                ViewState::Log(log) => chain.is_some_and(|c| !log.poll.is_current(c)),
                _ => true,
            };
            if stale {
                upl_debug!("ignoring log page for a superseded chain");
                Vec::new()
            } else {
                let poll = *state.poll_settings();
                let effects = match state.view_state_mut() {
                    ViewState::Log(log) => log_fetched(log, &poll, view, chain, result),
                    _ => Vec::new(),
                };
                state.mark_dirty();
                effects
            }
        }

        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// The view a completion message is addressed to, if it is one.
fn completion_view(msg: &Msg) -> Option<ViewId> {
    match msg {
        Msg::SettingsLoaded { view, .. }
        | Msg::SettingsSaved { view, .. }
        | Msg::ProjectsLoaded { view, .. }
        | Msg::ProjectDeleted { view, .. }
        | Msg::AuthorizationFinished { view, .. }
        | Msg::ProjectCreated { view, .. }
        | Msg::ProjectLoaded { view, .. }
        | Msg::PollTick { view, .. }
        | Msg::StatusFetched { view, .. }
        | Msg::RunStarted { view, .. }
        | Msg::RunCancelled { view, .. }
        | Msg::ProjectUpdated { view, .. }
        | Msg::FeedDownloaded { view, .. }
        | Msg::AssetUploadUrlFetched { view, .. }
        | Msg::UploadFinished { view, .. }
        | Msg::SheetExported { view, .. }
        | Msg::LogFetched { view, .. } => Some(*view),
        _ => None,
    }
}

fn reload(state: &mut AppState) -> Vec<Effect> {
    let route = state.route().clone();
    state.enter(route, false)
}

fn with_hidden_notice(rest: Vec<Effect>) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(rest.len() + 1);
    effects.push(Effect::HideNotice);
    effects.extend(rest);
    effects
}

fn report(failure: &Failure) -> Vec<Effect> {
    upl_warn!("request failed: {failure}");
    vec![Effect::ShowNotice(Notice::text(notice::GENERIC_FAILURE))]
}

fn next_page_route(state: &AppState) -> Option<Route> {
    match state.view_state() {
        ViewState::Projects(view) => {
            let page = view.page.as_ref().filter(|p| p.has_next)?;
            Some(Route::projects(Some(page.next()?)))
        }
        ViewState::Log(log) => {
            let page = log.page.as_ref().filter(|p| p.has_next)?;
            Some(Route::ProjectLog {
                id: log.project_id,
                cursor: Some(page.next()?.to_string()),
            })
        }
        _ => None,
    }
}

fn previous_page_route(state: &AppState) -> Option<Route> {
    match state.view_state() {
        ViewState::Projects(view) => {
            let page = view.page.as_ref().filter(|p| p.has_previous)?;
            Some(Route::projects(page.previous()))
        }
        ViewState::Log(log) => {
            let page = log.page.as_ref().filter(|p| p.has_previous)?;
            Some(Route::ProjectLog {
                id: log.project_id,
                cursor: page.previous().map(str::to_string),
            })
        }
        _ => None,
    }
}

/// Drops any pending tick and fetches status right away on a new chain,
/// unless the chain has no fetches to spend.
fn restart_status_chain(edit: &mut EditView, poll: &PollSettings, view: ViewId) -> Vec<Effect> {
    let chain = edit.poll.restart();
    let mut effects = vec![Effect::CancelPoll { view }];
    if edit.poll.begin_tick(chain, poll) {
        effects.push(Effect::FetchStatus {
            view,
            chain,
            project_id: edit.project_id,
        });
    }
    effects
}

fn status_fetched(
    state: &mut AppState,
    view: ViewId,
    chain: ChainId,
    result: Result<ProjectStatus, Failure>,
) -> Vec<Effect> {
    let poll = *state.poll_settings();
    let ViewState::Edit(edit) = state.view_state_mut() else {
        return Vec::new();
    };
    if !edit.poll.is_current(chain) {
        upl_debug!("ignoring status from superseded chain {chain}");
        return Vec::new();
    }

    let mut effects = Vec::new();
    let changed = match result {
        Ok(status) => {
            let previous = edit.status.replace(status);
            if let Some(notice) = notice::status_transition(previous, status) {
                upl_info!("project {} is now {}", edit.project_id, status.label());
                effects.push(Effect::ShowNotice(notice));
            }
            if let Some(delay) = edit.poll.on_success(&poll) {
                effects.push(Effect::SchedulePoll { view, chain, delay });
            }
            previous != Some(status)
        }
        Err(failure) => {
            upl_warn!("status poll failed: {failure}");
            effects.extend(after_poll_failure(edit.poll.on_failure(&poll), view, chain));
            true
        }
    };
    if changed {
        state.mark_dirty();
    }
    effects
}

fn log_fetched(
    log: &mut LogView,
    poll: &PollSettings,
    view: ViewId,
    chain: Option<ChainId>,
    result: Result<crate::Page<crate::LogEntry>, Failure>,
) -> Vec<Effect> {
    match chain {
        None => match result {
            Ok(page) => {
                log.project_name = page.entities.first().map(|e| e.project_name.clone());
                log.page = Some(page);
                let chain = log.poll.restart();
                let mut effects = vec![Effect::HideNotice, Effect::CancelPoll { view }];
                if poll.max_retries > 0 {
                    effects.push(Effect::SchedulePoll {
                        view,
                        chain,
                        delay: poll.interval,
                    });
                } else {
                    log.poll.stop();
                }
                effects
            }
            Err(failure) => report(&failure),
        },
        Some(chain) if log.poll.is_current(chain) => match result {
            Ok(page) => {
                if log.project_name.is_none() {
                    log.project_name = page.entities.first().map(|e| e.project_name.clone());
                }
                match log.page.as_mut() {
                    Some(current) => current.entities = page.entities,
                    None => log.page = Some(page),
                }
                match log.poll.on_success(poll) {
                    Some(delay) => vec![Effect::SchedulePoll { view, chain, delay }],
                    None => Vec::new(),
                }
            }
            Err(failure) => {
                upl_warn!("log poll failed: {failure}");
                after_poll_failure(log.poll.on_failure(poll), view, chain)
            }
        },
        Some(_) => Vec::new(),
    }
}

fn after_poll_failure(outcome: AfterFailure, view: ViewId, chain: ChainId) -> Vec<Effect> {
    match outcome {
        AfterFailure::Retry(delay) => vec![Effect::SchedulePoll { view, chain, delay }],
        AfterFailure::Exhausted => Vec::new(),
        AfterFailure::GiveUp => vec![Effect::ShowNotice(Notice::text(notice::POLL_GAVE_UP))],
    }
}

fn request_cancel_run(state: &mut AppState) -> Vec<Effect> {
    let view = state.view_id();
    match state.view_state() {
        ViewState::Edit(edit) if edit.project.is_some() => vec![Effect::CancelRun {
            view,
            project_id: edit.project_id,
        }],
        _ => Vec::new(),
    }
}

fn save_draft(state: &AppState) -> Vec<Effect> {
    match state.view_state() {
        ViewState::Edit(edit) => match &edit.draft {
            Some(draft) => vec![
                Effect::ShowNotice(Notice::text(notice::UPDATING)),
                Effect::UpdateProject {
                    view: state.view_id(),
                    project: draft.clone(),
                },
            ],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn start_feed_upload(edit: &mut EditView, view: ViewId) -> Vec<Effect> {
    if edit.feed_uploads.active().is_some() {
        return Vec::new();
    }
    let Some(file) = edit.feed_uploads.start_next() else {
        return Vec::new();
    };
    let url = edit
        .project
        .as_ref()
        .and_then(|p| p.feed_upload_url.clone())
        .filter(|u| !u.is_empty());
    match url {
        Some(url) => vec![Effect::UploadFile {
            view,
            kind: UploadKind::Feed,
            url,
            file,
        }],
        None => {
            upl_warn!("project {} has no feed upload url", edit.project_id);
            edit.feed_uploads.finish_active();
            vec![Effect::ShowNotice(Notice::text(notice::upload_failed(
                &file.name,
            )))]
        }
    }
}

/// A fresh signed URL is requested before every asset upload.
fn start_asset_upload(edit: &mut EditView, view: ViewId) -> Vec<Effect> {
    if edit.asset_uploads.active().is_some() {
        return Vec::new();
    }
    match edit.asset_uploads.start_next() {
        Some(_) => vec![Effect::FetchAssetUploadUrl {
            view,
            project_id: edit.project_id,
        }],
        None => Vec::new(),
    }
}

fn finish_upload(
    state: &mut AppState,
    view: ViewId,
    kind: UploadKind,
    file_name: &str,
    succeeded: bool,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    if !succeeded {
        effects.push(Effect::ShowNotice(Notice::text(notice::upload_failed(
            file_name,
        ))));
    }

    let batch_done = match state.view_state_mut() {
        ViewState::Edit(edit) => {
            let queue = match kind {
                UploadKind::Feed => &mut edit.feed_uploads,
                UploadKind::Asset => &mut edit.asset_uploads,
            };
            if queue.active().is_none() {
                return effects;
            }
            if queue.finish_active() {
                true
            } else {
                effects.extend(match kind {
                    UploadKind::Feed => start_feed_upload(edit, view),
                    UploadKind::Asset => start_asset_upload(edit, view),
                });
                false
            }
        }
        _ => return effects,
    };

    state.mark_dirty();
    if batch_done {
        upl_info!("{kind:?} upload batch complete; reloading");
        effects.extend(reload(state));
    }
    effects
}
