use std::path::{Path, PathBuf};

use thiserror::Error;
use uploader_core::{
    FileSource, Msg, NoticeAction, ProjectField, Route, SettingsField, UploadFile,
};

pub const HELP: &str = "\
navigation: projects | settings | new | go <path> | back | reload | next | prev
projects:   edit <id> | delete <id> | create <profile-id> <name>
settings:   set username|password|config <value> | save
project:    name|profile|notes <value> | save | run | stop | cancel
            feed <file.csv> | assets <file>... | sheet <url>
            remove-feed | remove-asset <key> | download | log
consent:    code <authorization-code>
            help | quit";

/// One line of user input, resolved against the screen it was typed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dispatch(Msg),
    AuthorizationCode(String),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`; type `help`")]
    Unknown(String),
    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("`{0}` is not a project id")]
    BadId(String),
    #[error("nothing to save on this screen")]
    NothingToSave,
}

pub fn parse(line: &str, route: &Route) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let msg = match head {
        "help" | "?" => return Ok(Some(Command::Help)),
        "quit" | "exit" => return Ok(Some(Command::Quit)),
        "code" => {
            let code = required(rest, "code", "the code shown after consent")?;
            return Ok(Some(Command::AuthorizationCode(code.to_string())));
        }
        "projects" => Msg::Navigate(Route::Projects),
        "go" => Msg::Navigate(Route::parse(required(rest, "go", "a path")?)),
        "settings" => Msg::SettingsClicked,
        "new" => Msg::NewProjectClicked,
        "back" => Msg::BackClicked,
        "reload" => Msg::Reload,
        "next" => Msg::NextPageClicked,
        "prev" | "previous" => Msg::PreviousPageClicked,
        "edit" => Msg::EditProjectClicked {
            project_id: project_id(required(rest, "edit", "a project id")?)?,
        },
        "delete" => Msg::DeleteProjectClicked {
            project_id: project_id(required(rest, "delete", "a project id")?)?,
        },
        "create" => {
            let args = required(rest, "create", "a profile id and a name")?;
            let (profile_id, name) = args.split_once(char::is_whitespace).ok_or(
                CommandError::MissingArgument {
                    command: "create",
                    what: "a profile id and a name",
                },
            )?;
            Msg::CreateProjectClicked {
                name: name.trim().to_string(),
                profile_id: profile_id.to_string(),
            }
        }
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let value = value.trim().to_string();
            match field {
                "username" => Msg::SettingsEdited(SettingsField::Username(value)),
                "password" => Msg::SettingsEdited(SettingsField::Password(value)),
                "config" => Msg::SettingsEdited(SettingsField::Config(value)),
                _ => {
                    return Err(CommandError::MissingArgument {
                        command: "set",
                        what: "username, password or config",
                    })
                }
            }
        }
        "save" => match route {
            Route::Settings => Msg::SaveSettingsClicked,
            Route::EditProject { .. } => Msg::SaveProjectClicked,
            _ => return Err(CommandError::NothingToSave),
        },
        "name" => Msg::ProjectEdited(ProjectField::Name(rest.to_string())),
        "profile" => Msg::ProjectEdited(ProjectField::ProfileId(rest.to_string())),
        "notes" => Msg::ProjectEdited(ProjectField::Notes(rest.to_string())),
        "run" => Msg::StartRunClicked,
        "stop" => Msg::CancelRunClicked,
        "cancel" => Msg::NoticeActionInvoked(NoticeAction::CancelRun),
        "feed" => Msg::FeedFileAdded(upload_file(Path::new(required(
            rest,
            "feed",
            "a CSV file",
        )?))),
        "assets" => {
            let files: Vec<UploadFile> = rest
                .split_whitespace()
                .map(|p| upload_file(Path::new(p)))
                .collect();
            if files.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "assets",
                    what: "one or more files",
                });
            }
            Msg::AssetFilesAdded(files)
        }
        "sheet" => Msg::SheetUrlSubmitted(required(rest, "sheet", "a Google Sheet URL")?.to_string()),
        "remove-feed" => Msg::RemoveFeedClicked,
        "remove-asset" => Msg::RemoveAssetClicked {
            key: required(rest, "remove-asset", "an asset key")?.to_string(),
        },
        "download" => Msg::DownloadFeedClicked,
        "log" => Msg::ShowLogClicked,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(Command::Dispatch(msg)))
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, what })
    } else {
        Ok(rest)
    }
}

fn project_id(raw: &str) -> Result<i64, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::BadId(raw.to_string()))
}

/// Content type comes from the extension, as a browser file picker would report it.
pub fn upload_file(path: &Path) -> UploadFile {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    UploadFile {
        name,
        content_type,
        source: FileSource::Path(PathBuf::from(path)),
    }
}
