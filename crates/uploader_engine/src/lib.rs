//! Uploader engine: backend client, timers and effect execution.
mod api;
mod auth;
mod engine;
mod persist;
mod scheduler;
mod sheets;
mod types;

pub use api::{BackendApi, BasicCredentials, ClientSettings, ReqwestBackend, UploadBody};
pub use auth::{Authorizer, StaticAuthorizer};
pub use engine::{EngineEvent, EngineHandle, EventSink, Reply, Request, Services};
pub use persist::{ensure_output_dir, safe_file_name, AtomicFileWriter, PersistError};
pub use scheduler::PollScheduler;
pub use sheets::{DriveSettings, DriveSheetExporter, SheetExporter, DRIVE_API_BASE};
pub use types::{ApiError, FailureKind};
