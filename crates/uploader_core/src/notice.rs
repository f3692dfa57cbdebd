/// Transient user-facing notification (a toast in the browser client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub action: Option<NoticeAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    /// "Cancel" on the running toast.
    CancelRun,
}

impl Notice {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: None,
        }
    }

    pub fn with_action(text: impl Into<String>, action: NoticeAction) -> Self {
        Self {
            text: text.into(),
            action: Some(action),
        }
    }
}

pub const LOADING: &str = "Loading...";
pub const SAVING: &str = "Saving...";
pub const UPDATING: &str = "Updating...";
pub const RUNNING: &str = "Running...";
pub const CANCELLING: &str = "Cancelling...";
pub const COMPLETED: &str = "Completed!";
pub const ERRORED: &str = "Error!";
pub const GENERIC_FAILURE: &str = "Something went wrong!";
pub const CREATE_FAILED: &str = "Something went wrong! Check your settings.";
pub const FEED_NOT_CSV: &str = "The feed needs to be a CSV!";
pub const FEED_BUSY: &str = "A feed upload is already in progress.";
pub const BAD_SHEET_URL: &str = "Oops! That URL doesn't look right. Try another.";
pub const POLL_GAVE_UP: &str = "Lost contact with the server. Updates paused.";

pub fn deleting(project_id: crate::ProjectId) -> String {
    format!("Deleting project {project_id}...")
}

pub fn upload_failed(file_name: &str) -> String {
    format!("Upload of {file_name} failed.")
}

/// Notification for a status change, if it deserves one. Only a move from
/// a known, still-moving status into a terminal one is announced; the
/// first status seen after loading a view never is.
pub fn status_transition(
    previous: Option<crate::ProjectStatus>,
    next: crate::ProjectStatus,
) -> Option<Notice> {
    let previous = previous.filter(|p| p.is_known_non_terminal())?;
    if previous == next || !next.is_terminal() {
        return None;
    }
    Some(Notice::text(if next == crate::ProjectStatus::Completed {
        COMPLETED
    } else {
        ERRORED
    }))
}
