use std::fmt::Write;

use chrono::{DateTime, Utc};
use uploader_core::{
    AppViewModel, EditScreen, LogScreen, Notice, NoticeAction, ProjectsScreen, ScreenView,
    SettingsScreen,
};

pub fn render(view: &AppViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", view.path);
    match &view.screen {
        ScreenView::Blank => {}
        ScreenView::Settings(screen) => settings(&mut out, screen),
        ScreenView::Projects(screen) => projects(&mut out, screen),
        ScreenView::NewProject {
            name,
            profile_id,
            saving,
        } => {
            let _ = writeln!(out, "New project");
            if *saving {
                let _ = writeln!(out, "  saving {name} (profile {profile_id})");
            } else {
                let _ = writeln!(out, "  create <profile-id> <name>");
            }
        }
        ScreenView::Edit(screen) => edit(&mut out, screen),
        ScreenView::Log(screen) => log(&mut out, screen),
    }
    out
}

pub fn notice_line(notice: &Notice) -> String {
    match notice.action {
        Some(NoticeAction::CancelRun) => format!(">> {}  [cancel]", notice.text),
        None => format!(">> {}", notice.text),
    }
}

/// Backend timestamps are ISO-8601 with a trailing `Z`.
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw {
        None => "-".to_string(),
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => ts.with_timezone(&Utc).format("%Y-%m-%d %H:%M UTC").to_string(),
            Err(_) => raw.to_string(),
        },
    }
}

fn settings(out: &mut String, screen: &SettingsScreen) {
    let Some(draft) = &screen.draft else {
        let _ = writeln!(out, "(loading)");
        return;
    };
    let _ = writeln!(out, "username: {}", draft.username);
    let masked = "*".repeat(draft.password.chars().count());
    let _ = writeln!(out, "password: {masked}");
    let _ = writeln!(out, "config:   {}", draft.config);
}

fn projects(out: &mut String, screen: &ProjectsScreen) {
    if !screen.loaded {
        let _ = writeln!(out, "(loading)");
        return;
    }
    if screen.rows.is_empty() {
        let _ = writeln!(out, "no projects yet; `new` creates one");
    }
    for row in &screen.rows {
        let _ = writeln!(
            out,
            "{:>8}  {:<11}  {:<20}  {}",
            row.id,
            row.status.label(),
            format_timestamp(row.updated_at.as_deref()),
            row.name
        );
    }
    pager(out, screen.has_previous, screen.has_next);
}

fn edit(out: &mut String, screen: &EditScreen) {
    let _ = writeln!(out, "Project {}", screen.project_id);
    let Some(draft) = &screen.draft else {
        let _ = writeln!(out, "(loading)");
        return;
    };
    let status = screen.status.unwrap_or(draft.status);
    let _ = writeln!(out, "name:       {}", draft.name);
    let _ = writeln!(out, "profile:    {}", draft.profile_id);
    let _ = writeln!(out, "notes:      {}", draft.notes.as_deref().unwrap_or(""));
    let _ = writeln!(out, "status:     {}", status.label());
    let _ = writeln!(
        out,
        "last run:   {} (completed {})",
        format_timestamp(draft.last_run_at.as_deref()),
        format_timestamp(draft.last_completed_at.as_deref())
    );
    match &draft.feed {
        Some(feed) => {
            let _ = writeln!(out, "feed:       {}", feed.filename);
        }
        None => {
            let _ = writeln!(out, "feed:       (none)");
        }
    }
    if let Some(sheet) = draft.sheets_feed_url.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "sheet:      {sheet}");
    }
    let _ = writeln!(out, "assets:     {}", draft.assets.len());
    for asset in &draft.assets {
        let _ = writeln!(out, "  {}  {}", asset.key, asset.filename);
    }
    if let Some(active) = &screen.uploading {
        let _ = writeln!(
            out,
            "uploading:  {active} ({} feed, {} assets queued)",
            screen.feed_queue, screen.asset_queue
        );
    }
    if screen.polling {
        let _ = writeln!(out, "watching status ({} checks)", screen.polls);
    }
}

fn log(out: &mut String, screen: &LogScreen) {
    let title = screen.project_name.as_deref().unwrap_or("project");
    let _ = writeln!(out, "Log for {title} ({})", screen.project_id);
    if !screen.loaded {
        let _ = writeln!(out, "(loading)");
        return;
    }
    for entry in &screen.entries {
        let _ = writeln!(
            out,
            "{:<20}  {:<7}  {}",
            format_timestamp(entry.created_at.as_deref()),
            entry.severity.label(),
            entry.message
        );
    }
    pager(out, screen.has_previous, screen.has_next);
}

fn pager(out: &mut String, has_previous: bool, has_next: bool) {
    match (has_previous, has_next) {
        (true, true) => {
            let _ = writeln!(out, "-- prev | next --");
        }
        (true, false) => {
            let _ = writeln!(out, "-- prev --");
        }
        (false, true) => {
            let _ = writeln!(out, "-- next --");
        }
        (false, false) => {}
    }
}
