use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use uploader_core::{
    update, AppState, ChainId, Effect, Failure, FailureClass, LogEntry, Msg, Notice, NoticeAction,
    Page, PollSettings, Project, ProjectStatus, Route, ScreenView, ViewId,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(uploader_logging::initialize_for_tests);
}

fn settings(max_retries: u32) -> PollSettings {
    PollSettings {
        interval: Duration::from_secs(5),
        max_retries,
        max_backoff: Duration::from_secs(60),
        max_consecutive_failures: 3,
    }
}

/// Opens the editor for project 7 and returns the chain id of the first status fetch.
fn open_editor(poll: PollSettings) -> (AppState, ViewId, ChainId) {
    let state = AppState::with_poll_settings(poll);
    let (state, _) = update(state, Msg::Navigate(Route::EditProject { id: 7 }));
    let view = state.view_id();
    let (state, effects) = update(
        state,
        Msg::ProjectLoaded {
            view,
            result: Ok(Project {
                id: 7,
                name: "Seven".into(),
                feed_upload_url: Some("/upload/feed".into()),
                ..Project::default()
            }),
        },
    );
    let chain = first_status_fetch(&effects).expect("initial status fetch");
    (state, view, chain)
}

fn first_status_fetch(effects: &[Effect]) -> Option<ChainId> {
    effects.iter().find_map(|effect| match effect {
        Effect::FetchStatus { chain, .. } => Some(*chain),
        _ => None,
    })
}

fn scheduled(effects: &[Effect]) -> Option<(ChainId, Duration)> {
    effects.iter().find_map(|effect| match effect {
        Effect::SchedulePoll { chain, delay, .. } => Some((*chain, *delay)),
        _ => None,
    })
}

fn notices(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::ShowNotice(notice) => Some(notice.text.clone()),
            _ => None,
        })
        .collect()
}

fn status_reply(
    state: AppState,
    view: ViewId,
    chain: ChainId,
    status: ProjectStatus,
) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StatusFetched {
            view,
            chain,
            result: Ok(status),
        },
    )
}

#[test]
fn chain_with_bound_n_fetches_exactly_n_times() {
    init_logging();
    let (mut state, view, chain) = open_editor(settings(4));
    let mut fetches = 1;

    loop {
        let (next, effects) = status_reply(state, view, chain, ProjectStatus::Running);
        state = next;
        let Some((next_chain, delay)) = scheduled(&effects) else {
            break;
        };
        assert_eq!(next_chain, chain);
        assert_eq!(delay, Duration::from_secs(5));

        let (next, effects) = update(state, Msg::PollTick { view, chain });
        state = next;
        if first_status_fetch(&effects).is_some() {
            fetches += 1;
        }
    }

    assert_eq!(fetches, 4);
    match state.view().screen {
        ScreenView::Edit(edit) => {
            assert_eq!(edit.polls, 4);
            assert!(!edit.polling);
        }
        other => panic!("unexpected screen {other:?}"),
    }
}

#[test]
fn no_fetch_happens_after_the_view_is_disposed() {
    init_logging();
    let (state, view, chain) = open_editor(settings(500));
    let (state, _) = status_reply(state, view, chain, ProjectStatus::Running);

    let (state, effects) = update(state, Msg::Navigate(Route::Projects));
    assert!(effects.contains(&Effect::CancelPoll { view }));

    let (state, effects) = update(state, Msg::PollTick { view, chain });
    assert!(effects.is_empty());

    // A late response for the old view must not touch the new one either.
    let before = state.clone();
    let (state, effects) = status_reply(state, view, chain, ProjectStatus::Completed);
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn running_to_error_notifies_once_and_keeps_polling() {
    init_logging();
    let (state, view, chain) = open_editor(settings(500));
    let (state, effects) = status_reply(state, view, chain, ProjectStatus::Running);
    assert!(notices(&effects).is_empty());

    let (state, effects) = update(state, Msg::PollTick { view, chain });
    assert!(first_status_fetch(&effects).is_some());
    let (state, effects) = status_reply(state, view, chain, ProjectStatus::Error);
    assert_eq!(notices(&effects), vec!["Error!".to_string()]);
    assert!(scheduled(&effects).is_some());

    // Staying in ERROR does not notify again.
    let (state, _) = update(state, Msg::PollTick { view, chain });
    let (_, effects) = status_reply(state, view, chain, ProjectStatus::Error);
    assert!(notices(&effects).is_empty());
}

#[test]
fn running_to_completed_notifies() {
    init_logging();
    let (state, view, chain) = open_editor(settings(500));
    let (state, _) = status_reply(state, view, chain, ProjectStatus::Initialized);
    let (state, _) = update(state, Msg::PollTick { view, chain });
    let (_, effects) = status_reply(state, view, chain, ProjectStatus::Completed);
    assert_eq!(notices(&effects), vec!["Completed!".to_string()]);
}

#[test]
fn first_status_after_load_never_notifies() {
    init_logging();
    let (state, view, chain) = open_editor(settings(500));
    let (state, effects) = status_reply(state, view, chain, ProjectStatus::Completed);
    assert!(notices(&effects).is_empty());

    let (state, _) = update(state, Msg::PollTick { view, chain });
    let (_, effects) = status_reply(state, view, chain, ProjectStatus::Error);
    assert!(notices(&effects).is_empty(), "terminal to terminal is silent");
}

#[test]
fn starting_a_run_restarts_the_chain_and_offers_cancel() {
    init_logging();
    let (state, view, old_chain) = open_editor(settings(500));

    let (state, effects) = update(state, Msg::StartRunClicked);
    assert_eq!(
        effects,
        vec![Effect::StartRun {
            view,
            project_id: 7
        }]
    );

    let (state, effects) = update(state, Msg::RunStarted { view, result: Ok(()) });
    assert_eq!(
        effects[0],
        Effect::ShowNotice(Notice::with_action("Running...", NoticeAction::CancelRun))
    );
    assert!(effects.contains(&Effect::CancelPoll { view }));
    let new_chain = first_status_fetch(&effects).expect("immediate status fetch");
    assert_ne!(new_chain, old_chain);

    // The reply to the superseded request is ignored.
    let (state, effects) = status_reply(state, view, old_chain, ProjectStatus::Completed);
    assert!(effects.is_empty());

    // RUNNING was set locally, so a completion on the new chain is announced.
    let (state, effects) = status_reply(state, view, new_chain, ProjectStatus::Completed);
    assert_eq!(notices(&effects), vec!["Completed!".to_string()]);

    let (_, effects) = update(state, Msg::NoticeActionInvoked(NoticeAction::CancelRun));
    assert_eq!(
        effects,
        vec![Effect::CancelRun {
            view,
            project_id: 7
        }]
    );
}

#[test]
fn cancelling_a_run_restarts_polling() {
    init_logging();
    let (state, view, old_chain) = open_editor(settings(500));
    let (_, effects) = update(state, Msg::RunCancelled { view, result: Ok(()) });

    assert_eq!(notices(&effects), vec!["Cancelling...".to_string()]);
    let chain = first_status_fetch(&effects).expect("status fetch");
    assert!(chain > old_chain);
}

#[test]
fn failed_polls_back_off_and_eventually_stop() {
    init_logging();
    let (mut state, view, chain) = open_editor(settings(500));
    let failure = || Err(Failure::new(FailureClass::Transport, "connection refused"));

    let mut delays = Vec::new();
    loop {
        let (next, effects) = update(
            state,
            Msg::StatusFetched {
                view,
                chain,
                result: failure(),
            },
        );
        state = next;
        match scheduled(&effects) {
            Some((_, delay)) => {
                delays.push(delay);
                let (next, _) = update(state, Msg::PollTick { view, chain });
                state = next;
            }
            None => {
                assert_eq!(
                    notices(&effects),
                    vec!["Lost contact with the server. Updates paused.".to_string()]
                );
                break;
            }
        }
    }
    assert_eq!(delays, vec![Duration::from_secs(5), Duration::from_secs(10)]);
}

fn log_entry(id: i64, message: &str) -> LogEntry {
    LogEntry {
        id,
        project_id: 7,
        project_name: "Seven".into(),
        message: message.into(),
        ..LogEntry::default()
    }
}

#[test]
fn log_view_polls_its_own_cursor() {
    init_logging();
    let state = AppState::with_poll_settings(settings(500));
    let (state, effects) = update(
        state,
        Msg::Navigate(Route::ProjectLog {
            id: 7,
            cursor: Some("lc1".into()),
        }),
    );
    let view = state.view_id();
    assert!(effects.contains(&Effect::FetchLog {
        view,
        chain: None,
        project_id: 7,
        cursor: Some("lc1".into()),
    }));

    let (state, effects) = update(
        state,
        Msg::LogFetched {
            view,
            chain: None,
            result: Ok(Page {
                entities: vec![log_entry(1, "Created.")],
                ..Page::default()
            }),
        },
    );
    let (chain, delay) = scheduled(&effects).expect("first tick scheduled");
    assert_eq!(delay, Duration::from_secs(5));

    let (state, effects) = update(state, Msg::PollTick { view, chain });
    assert_eq!(
        effects,
        vec![Effect::FetchLog {
            view,
            chain: Some(chain),
            project_id: 7,
            cursor: Some("lc1".into()),
        }]
    );

    let (state, _) = update(
        state,
        Msg::LogFetched {
            view,
            chain: Some(chain),
            result: Ok(Page {
                entities: vec![log_entry(2, "Running."), log_entry(1, "Created.")],
                ..Page::default()
            }),
        },
    );
    match state.view().screen {
        ScreenView::Log(log) => {
            assert_eq!(log.project_name.as_deref(), Some("Seven"));
            let messages: Vec<_> = log.entries.iter().map(|e| e.message.as_str()).collect();
            assert_eq!(messages, vec!["Running.", "Created."]);
        }
        other => panic!("unexpected screen {other:?}"),
    }
}

#[test]
fn zero_bound_chain_never_fetches() {
    init_logging();
    let state = AppState::with_poll_settings(settings(0));
    let (state, _) = update(state, Msg::Navigate(Route::EditProject { id: 7 }));
    let view = state.view_id();
    let (state, effects) = update(
        state,
        Msg::ProjectLoaded {
            view,
            result: Ok(Project {
                id: 7,
                ..Project::default()
            }),
        },
    );
    assert_eq!(first_status_fetch(&effects), None);
    assert!(scheduled(&effects).is_none());
    match state.view().screen {
        ScreenView::Edit(edit) => {
            assert_eq!(edit.polls, 0);
            assert!(!edit.polling);
        }
        other => panic!("unexpected screen {other:?}"),
    }

    let (state, _) = update(state, Msg::Navigate(Route::ProjectLog { id: 7, cursor: None }));
    let view = state.view_id();
    let (_, effects) = update(
        state,
        Msg::LogFetched {
            view,
            chain: None,
            result: Ok(Page::default()),
        },
    );
    assert!(scheduled(&effects).is_none());
}

#[test]
fn failure_on_the_last_allowed_fetch_ends_quietly() {
    init_logging();
    let (state, view, chain) = open_editor(settings(2));
    let (state, effects) = status_reply(state, view, chain, ProjectStatus::Running);
    assert!(scheduled(&effects).is_some());
    let (state, effects) = update(state, Msg::PollTick { view, chain });
    assert_eq!(first_status_fetch(&effects), Some(chain));

    let (state, effects) = update(
        state,
        Msg::StatusFetched {
            view,
            chain,
            result: Err(Failure::new(FailureClass::Transport, "reset")),
        },
    );
    assert!(effects.is_empty());
    let (_, effects) = update(state, Msg::PollTick { view, chain });
    assert!(effects.is_empty());
}

/// Opens the log view for project 7 and returns the chain of its first tick.
fn open_log(poll: PollSettings) -> (AppState, ViewId, ChainId) {
    let state = AppState::with_poll_settings(poll);
    let (state, _) = update(state, Msg::Navigate(Route::ProjectLog { id: 7, cursor: None }));
    let view = state.view_id();
    let (state, effects) = update(
        state,
        Msg::LogFetched {
            view,
            chain: None,
            result: Ok(Page {
                entities: vec![log_entry(1, "Created.")],
                ..Page::default()
            }),
        },
    );
    let (chain, _) = scheduled(&effects).expect("first tick scheduled");
    (state, view, chain)
}

#[test]
fn log_poll_failures_back_off_and_eventually_stop() {
    init_logging();
    let (mut state, view, chain) = open_log(settings(500));

    let mut delays = Vec::new();
    loop {
        let (next, effects) = update(state, Msg::PollTick { view, chain });
        state = next;
        assert!(effects.iter().any(|e| matches!(e, Effect::FetchLog { .. })));

        let (next, effects) = update(
            state,
            Msg::LogFetched {
                view,
                chain: Some(chain),
                result: Err(Failure::new(FailureClass::Http(503), "unavailable")),
            },
        );
        state = next;
        match scheduled(&effects) {
            Some((_, delay)) => delays.push(delay),
            None => {
                assert_eq!(
                    notices(&effects),
                    vec!["Lost contact with the server. Updates paused.".to_string()]
                );
                break;
            }
        }
    }
    assert_eq!(delays, vec![Duration::from_secs(5), Duration::from_secs(10)]);
}

#[test]
fn log_reply_from_a_superseded_chain_is_ignored() {
    init_logging();
    let (state, view, chain) = open_log(settings(500));
    let (state, _) = update(state, Msg::PollTick { view, chain });

    // Reloading the first page starts a new chain.
    let (state, effects) = update(
        state,
        Msg::LogFetched {
            view,
            chain: None,
            result: Ok(Page {
                entities: vec![log_entry(1, "Created.")],
                ..Page::default()
            }),
        },
    );
    let (new_chain, _) = scheduled(&effects).expect("new chain scheduled");
    assert_ne!(new_chain, chain);

    let before = state.clone();
    let (state, effects) = update(
        state,
        Msg::LogFetched {
            view,
            chain: Some(chain),
            result: Ok(Page {
                entities: vec![log_entry(9, "Stale.")],
                ..Page::default()
            }),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn no_log_fetch_happens_after_the_view_is_disposed() {
    init_logging();
    let (state, view, chain) = open_log(settings(500));

    let (state, effects) = update(state, Msg::Navigate(Route::Projects));
    assert!(effects.contains(&Effect::CancelPoll { view }));

    let (state, effects) = update(state, Msg::PollTick { view, chain });
    assert!(effects.is_empty());

    let before = state.clone();
    let (state, effects) = update(
        state,
        Msg::LogFetched {
            view,
            chain: Some(chain),
            result: Ok(Page {
                entities: vec![log_entry(2, "Late.")],
                ..Page::default()
            }),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state, before);
}
