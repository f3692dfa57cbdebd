use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use uploader_core::{
    FileSource, LogEntry, NewProject, Page, Project, ProjectId, ProjectStatus, Settings,
    UploadFile,
};
use uploader_logging::{upl_debug, upl_info, upl_warn};

use crate::api::{BackendApi, UploadBody};
use crate::auth::Authorizer;
use crate::persist::AtomicFileWriter;
use crate::scheduler::PollScheduler;
use crate::sheets::SheetExporter;
use crate::{ApiError, FailureKind};

/// One backend operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Settings,
    SaveSettings(Settings),
    Projects { cursor: Option<String> },
    CreateProject(NewProject),
    Project(ProjectId),
    UpdateProject(Project),
    DeleteProject(ProjectId),
    Status(ProjectId),
    StartRun(ProjectId),
    CancelRun(ProjectId),
    AssetUploadUrl(ProjectId),
    Upload { url: String, file: UploadFile },
    DownloadFeed { project_id: ProjectId, file_name: String },
    ExportSheet { sheet_id: String },
    Log { project_id: ProjectId, cursor: Option<String> },
    Authorize,
}

impl Request {
    pub fn label(&self) -> &'static str {
        match self {
            Request::Settings => "settings",
            Request::SaveSettings(_) => "save settings",
            Request::Projects { .. } => "projects",
            Request::CreateProject(_) => "create project",
            Request::Project(_) => "project",
            Request::UpdateProject(_) => "update project",
            Request::DeleteProject(_) => "delete project",
            Request::Status(_) => "status",
            Request::StartRun(_) => "start run",
            Request::CancelRun(_) => "cancel run",
            Request::AssetUploadUrl(_) => "asset upload url",
            Request::Upload { .. } => "upload",
            Request::DownloadFeed { .. } => "download feed",
            Request::ExportSheet { .. } => "export sheet",
            Request::Log { .. } => "log",
            Request::Authorize => "authorize",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Settings(Settings),
    Projects(Page<Project>),
    Project(Project),
    Status(ProjectStatus),
    Done,
    UploadUrl(String),
    Log(Page<LogEntry>),
    Saved(PathBuf),
    Csv(String),
    AuthorizationCode(String),
}

/// Engine output. `context` is whatever the caller attached to the command.
#[derive(Debug)]
pub enum EngineEvent<C> {
    Completed {
        context: C,
        result: Result<Reply, ApiError>,
    },
    TimerFired {
        context: C,
    },
}

pub trait EventSink<C>: Send + Sync {
    fn emit(&self, event: EngineEvent<C>);
}

impl<C: Send> EventSink<C> for mpsc::Sender<EngineEvent<C>> {
    fn emit(&self, event: EngineEvent<C>) {
        let _ = self.send(event);
    }
}

/// The IO seams the engine drives.
#[derive(Clone)]
pub struct Services {
    pub backend: Arc<dyn BackendApi>,
    pub sheets: Arc<dyn SheetExporter>,
    pub authorizer: Arc<dyn Authorizer>,
    pub downloads: AtomicFileWriter,
}

enum EngineCommand<C> {
    Execute { context: C, request: Request },
    Schedule { key: u64, delay: Duration, context: C },
    Cancel { key: u64 },
}

pub struct EngineHandle<C> {
    cmd_tx: mpsc::Sender<EngineCommand<C>>,
}

impl<C> Clone for EngineHandle<C> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
        }
    }
}

impl<C: Send + 'static> EngineHandle<C> {
    /// Starts the runtime thread. Events go to `sink` from runtime worker
    /// threads.
    pub fn start(services: Services, sink: Arc<dyn EventSink<C>>) -> io::Result<Self> {
        let runtime = tokio::runtime::Runtime::new()?;
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand<C>>();
        let services = Arc::new(services);

        thread::Builder::new()
            .name("uploader-engine".to_string())
            .spawn(move || {
                let scheduler = PollScheduler::new(runtime.handle().clone());
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::Execute { context, request } => {
                            let services = services.clone();
                            let sink = sink.clone();
                            runtime.spawn(async move {
                                let label = request.label();
                                let result = execute(&services, request).await;
                                match &result {
                                    Ok(_) => upl_debug!("{label} finished"),
                                    Err(err) => upl_warn!("{label} failed: {err}"),
                                }
                                sink.emit(EngineEvent::Completed { context, result });
                            });
                        }
                        EngineCommand::Schedule {
                            key,
                            delay,
                            context,
                        } => {
                            let sink = sink.clone();
                            scheduler.schedule(key, delay, move || {
                                sink.emit(EngineEvent::TimerFired { context });
                            });
                        }
                        EngineCommand::Cancel { key } => {
                            if scheduler.cancel(key) {
                                upl_debug!("cancelled timer {key}");
                            }
                        }
                    }
                }
                upl_info!("engine shutting down");
                drop(scheduler);
            })?;

        Ok(Self { cmd_tx })
    }

    /// Convenience wiring that delivers events on a plain channel.
    pub fn with_channel(services: Services) -> io::Result<(Self, mpsc::Receiver<EngineEvent<C>>)> {
        let (event_tx, event_rx) = mpsc::channel();
        let handle = Self::start(services, Arc::new(event_tx))?;
        Ok((handle, event_rx))
    }

    pub fn execute(&self, context: C, request: Request) {
        let _ = self.cmd_tx.send(EngineCommand::Execute { context, request });
    }

    /// Fires `context` back after `delay` unless cancelled or replaced by
    /// another timer with the same key.
    pub fn schedule(&self, key: u64, delay: Duration, context: C) {
        let _ = self.cmd_tx.send(EngineCommand::Schedule {
            key,
            delay,
            context,
        });
    }

    pub fn cancel(&self, key: u64) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { key });
    }
}

async fn execute(services: &Services, request: Request) -> Result<Reply, ApiError> {
    let backend = services.backend.as_ref();
    match request {
        Request::Settings => backend.settings().await.map(Reply::Settings),
        Request::SaveSettings(settings) => {
            backend.update_settings(&settings).await.map(Reply::Settings)
        }
        Request::Projects { cursor } => backend
            .projects(cursor.as_deref())
            .await
            .map(Reply::Projects),
        Request::CreateProject(project) => {
            backend.create_project(&project).await.map(Reply::Project)
        }
        Request::Project(id) => backend.project(id).await.map(Reply::Project),
        Request::UpdateProject(project) => {
            backend.update_project(&project).await.map(Reply::Project)
        }
        Request::DeleteProject(id) => backend.delete_project(id).await.map(|()| Reply::Done),
        Request::Status(id) => backend.status(id).await.map(Reply::Status),
        Request::StartRun(id) => backend.start_run(id).await.map(|()| Reply::Done),
        Request::CancelRun(id) => backend.cancel_run(id).await.map(|()| Reply::Done),
        Request::AssetUploadUrl(id) => backend.asset_upload_url(id).await.map(Reply::UploadUrl),
        Request::Upload { url, file } => {
            let body = load_upload(file).await?;
            backend.upload(&url, body).await.map(|()| Reply::Done)
        }
        Request::DownloadFeed {
            project_id,
            file_name,
        } => {
            let bytes = backend.feed(project_id).await?;
            let writer = services.downloads.clone();
            let path = tokio::task::spawn_blocking(move || writer.write(&file_name, &bytes))
                .await
                .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))??;
            Ok(Reply::Saved(path))
        }
        Request::ExportSheet { sheet_id } => {
            services.sheets.export_csv(&sheet_id).await.map(Reply::Csv)
        }
        Request::Log { project_id, cursor } => backend
            .log(project_id, cursor.as_deref())
            .await
            .map(Reply::Log),
        Request::Authorize => services
            .authorizer
            .authorization_code()
            .await
            .map(Reply::AuthorizationCode),
    }
}

async fn load_upload(file: UploadFile) -> Result<UploadBody, ApiError> {
    let bytes = match file.source {
        FileSource::Inline(bytes) => bytes,
        FileSource::Path(path) => tokio::fs::read(&path).await.map_err(|err| {
            ApiError::new(FailureKind::Io, format!("{}: {err}", path.display()))
        })?,
    };
    Ok(UploadBody {
        file_name: file.name,
        content_type: file.content_type,
        bytes,
    })
}
