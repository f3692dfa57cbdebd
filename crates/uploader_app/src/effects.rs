use std::time::Duration;

use uploader_core::{Effect, Failure, FailureClass, Msg, Notice};
use uploader_engine::{ApiError, EngineEvent, EngineHandle, Reply, Request};
use uploader_logging::{upl_debug, upl_warn};

/// What the runtime does with one effect.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    Execute(Request),
    Schedule { key: u64, delay: Duration },
    Cancel { key: u64 },
    Notice(Option<Notice>),
}

pub fn plan(effect: &Effect) -> EngineAction {
    match effect.clone() {
        Effect::ShowNotice(notice) => EngineAction::Notice(Some(notice)),
        Effect::HideNotice => EngineAction::Notice(None),
        Effect::FetchSettings { .. } => EngineAction::Execute(Request::Settings),
        Effect::SaveSettings { settings, .. } => {
            EngineAction::Execute(Request::SaveSettings(settings))
        }
        Effect::FetchProjects { cursor, .. } => EngineAction::Execute(Request::Projects { cursor }),
        Effect::DeleteProject { project_id, .. } => {
            EngineAction::Execute(Request::DeleteProject(project_id))
        }
        Effect::RequestAuthorization { .. } => EngineAction::Execute(Request::Authorize),
        Effect::CreateProject { project, .. } => {
            EngineAction::Execute(Request::CreateProject(project))
        }
        Effect::FetchProject { project_id, .. } => {
            EngineAction::Execute(Request::Project(project_id))
        }
        Effect::UpdateProject { project, .. } => {
            EngineAction::Execute(Request::UpdateProject(project))
        }
        Effect::FetchStatus { project_id, .. } => {
            EngineAction::Execute(Request::Status(project_id))
        }
        Effect::StartRun { project_id, .. } => EngineAction::Execute(Request::StartRun(project_id)),
        Effect::CancelRun { project_id, .. } => {
            EngineAction::Execute(Request::CancelRun(project_id))
        }
        Effect::FetchAssetUploadUrl { project_id, .. } => {
            EngineAction::Execute(Request::AssetUploadUrl(project_id))
        }
        Effect::UploadFile { url, file, .. } => EngineAction::Execute(Request::Upload { url, file }),
        Effect::DownloadFeed {
            project_id,
            file_name,
            ..
        } => EngineAction::Execute(Request::DownloadFeed {
            project_id,
            file_name,
        }),
        Effect::ExportSheet { sheet_id, .. } => {
            EngineAction::Execute(Request::ExportSheet { sheet_id })
        }
        Effect::FetchLog {
            project_id, cursor, ..
        } => EngineAction::Execute(Request::Log { project_id, cursor }),
        Effect::SchedulePoll { view, delay, .. } => EngineAction::Schedule { key: view, delay },
        Effect::CancelPoll { view } => EngineAction::Cancel { key: view },
    }
}

/// Hands effects to the engine, keeping the effect itself as the context so
/// the completion can be turned back into a message.
pub struct EffectRunner {
    engine: EngineHandle<Effect>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle<Effect>) -> Self {
        Self { engine }
    }

    /// Returns the notice changes in order; everything else goes to the engine.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<Option<Notice>> {
        let mut notices = Vec::new();
        for effect in effects {
            match plan(&effect) {
                EngineAction::Execute(request) => {
                    upl_debug!("execute {}", request.label());
                    self.engine.execute(effect, request);
                }
                EngineAction::Schedule { key, delay } => {
                    self.engine.schedule(key, delay, effect);
                }
                EngineAction::Cancel { key } => self.engine.cancel(key),
                EngineAction::Notice(notice) => notices.push(notice),
            }
        }
        notices
    }
}

pub fn event_to_msg(event: EngineEvent<Effect>) -> Msg {
    match event {
        EngineEvent::TimerFired { context } => match context {
            Effect::SchedulePoll { view, chain, .. } => Msg::PollTick { view, chain },
            other => {
                upl_warn!("timer fired for non-poll effect {other:?}");
                Msg::NoOp
            }
        },
        EngineEvent::Completed { context, result } => completion_to_msg(context, result),
    }
}

fn completion_to_msg(context: Effect, result: Result<Reply, ApiError>) -> Msg {
    match context {
        Effect::FetchSettings { view } => Msg::SettingsLoaded {
            view,
            result: settings(result),
        },
        Effect::SaveSettings { view, .. } => Msg::SettingsSaved {
            view,
            result: settings(result),
        },
        Effect::FetchProjects { view, .. } => Msg::ProjectsLoaded {
            view,
            result: pick(result, |reply| match reply {
                Reply::Projects(page) => Some(page),
                _ => None,
            }),
        },
        Effect::DeleteProject { view, project_id } => Msg::ProjectDeleted {
            view,
            project_id,
            result: done(result),
        },
        Effect::RequestAuthorization { view } => Msg::AuthorizationFinished {
            view,
            result: match result {
                Ok(Reply::AuthorizationCode(code)) => Ok(code),
                Ok(other) => Err(format!("unexpected reply: {other:?}")),
                Err(err) => Err(err.message),
            },
        },
        Effect::CreateProject { view, .. } => Msg::ProjectCreated {
            view,
            result: project(result),
        },
        Effect::FetchProject { view, .. } => Msg::ProjectLoaded {
            view,
            result: project(result),
        },
        Effect::UpdateProject { view, .. } => Msg::ProjectUpdated {
            view,
            result: project(result),
        },
        Effect::FetchStatus { view, chain, .. } => Msg::StatusFetched {
            view,
            chain,
            result: pick(result, |reply| match reply {
                Reply::Status(status) => Some(status),
                _ => None,
            }),
        },
        Effect::StartRun { view, .. } => Msg::RunStarted {
            view,
            result: done(result),
        },
        Effect::CancelRun { view, .. } => Msg::RunCancelled {
            view,
            result: done(result),
        },
        Effect::FetchAssetUploadUrl { view, .. } => Msg::AssetUploadUrlFetched {
            view,
            result: pick(result, |reply| match reply {
                Reply::UploadUrl(url) => Some(url),
                _ => None,
            }),
        },
        Effect::UploadFile {
            view, kind, file, ..
        } => Msg::UploadFinished {
            view,
            kind,
            file_name: file.name,
            result: done(result),
        },
        Effect::DownloadFeed { view, .. } => Msg::FeedDownloaded {
            view,
            result: pick(result, |reply| match reply {
                Reply::Saved(path) => Some(path),
                _ => None,
            }),
        },
        Effect::ExportSheet { view, url, .. } => Msg::SheetExported {
            view,
            url,
            result: pick(result, |reply| match reply {
                Reply::Csv(csv) => Some(csv),
                _ => None,
            }),
        },
        Effect::FetchLog { view, chain, .. } => Msg::LogFetched {
            view,
            chain,
            result: pick(result, |reply| match reply {
                Reply::Log(page) => Some(page),
                _ => None,
            }),
        },
        Effect::ShowNotice(_)
        | Effect::HideNotice
        | Effect::SchedulePoll { .. }
        | Effect::CancelPoll { .. } => Msg::NoOp,
    }
}

fn pick<T>(
    result: Result<Reply, ApiError>,
    select: impl FnOnce(Reply) -> Option<T>,
) -> Result<T, Failure> {
    match result {
        Ok(reply) => {
            let shape = format!("{reply:?}");
            select(reply).ok_or_else(|| {
                Failure::new(FailureClass::Invalid, format!("unexpected reply: {shape}"))
            })
        }
        Err(err) => Err(err.to_failure()),
    }
}

fn settings(result: Result<Reply, ApiError>) -> Result<uploader_core::Settings, Failure> {
    pick(result, |reply| match reply {
        Reply::Settings(settings) => Some(settings),
        _ => None,
    })
}

fn project(result: Result<Reply, ApiError>) -> Result<uploader_core::Project, Failure> {
    pick(result, |reply| match reply {
        Reply::Project(project) => Some(project),
        _ => None,
    })
}

fn done(result: Result<Reply, ApiError>) -> Result<(), Failure> {
    pick(result, |reply| match reply {
        Reply::Done => Some(()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uploader_core::{ProjectStatus, UploadFile, UploadKind};
    use uploader_engine::FailureKind;

    #[test]
    fn poll_effects_map_to_view_keyed_timers() {
        let schedule = Effect::SchedulePoll {
            view: 4,
            chain: 2,
            delay: Duration::from_secs(5),
        };
        assert_eq!(
            plan(&schedule),
            EngineAction::Schedule {
                key: 4,
                delay: Duration::from_secs(5)
            }
        );
        assert_eq!(plan(&Effect::CancelPoll { view: 4 }), EngineAction::Cancel { key: 4 });
    }

    #[test]
    fn cursor_passes_through_to_request() {
        let effect = Effect::FetchProjects {
            view: 1,
            cursor: Some("c2".to_string()),
        };
        assert_eq!(
            plan(&effect),
            EngineAction::Execute(Request::Projects {
                cursor: Some("c2".to_string())
            })
        );
    }

    #[test]
    fn timer_becomes_poll_tick_for_its_chain() {
        let msg = event_to_msg(EngineEvent::TimerFired {
            context: Effect::SchedulePoll {
                view: 9,
                chain: 3,
                delay: Duration::from_secs(5),
            },
        });
        assert_eq!(msg, Msg::PollTick { view: 9, chain: 3 });
    }

    #[test]
    fn status_completion_keeps_view_and_chain() {
        let msg = event_to_msg(EngineEvent::Completed {
            context: Effect::FetchStatus {
                view: 2,
                chain: 5,
                project_id: 7,
            },
            result: Ok(Reply::Status(ProjectStatus::Completed)),
        });
        assert_eq!(
            msg,
            Msg::StatusFetched {
                view: 2,
                chain: 5,
                result: Ok(ProjectStatus::Completed)
            }
        );
    }

    #[test]
    fn upload_failure_names_the_file() {
        let msg = event_to_msg(EngineEvent::Completed {
            context: Effect::UploadFile {
                view: 1,
                kind: UploadKind::Asset,
                url: "https://upload.example/x".to_string(),
                file: UploadFile::csv("banner.csv", "a"),
            },
            result: Err(ApiError::new(FailureKind::HttpStatus(500), "boom")),
        });
        assert_eq!(
            msg,
            Msg::UploadFinished {
                view: 1,
                kind: UploadKind::Asset,
                file_name: "banner.csv".to_string(),
                result: Err(Failure::new(FailureClass::Http(500), "boom")),
            }
        );
    }

    #[test]
    fn authorizer_error_text_is_kept_verbatim() {
        let msg = event_to_msg(EngineEvent::Completed {
            context: Effect::RequestAuthorization { view: 3 },
            result: Err(ApiError::new(FailureKind::Unauthorized, "popup_closed_by_user")),
        });
        assert_eq!(
            msg,
            Msg::AuthorizationFinished {
                view: 3,
                result: Err("popup_closed_by_user".to_string())
            }
        );
    }

    #[test]
    fn mismatched_reply_is_invalid() {
        let msg = event_to_msg(EngineEvent::Completed {
            context: Effect::FetchProject {
                view: 1,
                project_id: 1,
            },
            result: Ok(Reply::Done),
        });
        let Msg::ProjectLoaded { result, .. } = msg else {
            panic!("expected ProjectLoaded");
        };
        assert_eq!(result.unwrap_err().class, FailureClass::Invalid);
    }
}
