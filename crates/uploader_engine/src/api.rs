use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uploader_core::{
    LogEntry, NewProject, Page, Project, ProjectId, ProjectStatus, Settings, StatusReport,
    UploadTicket,
};
use uploader_logging::{upl_debug, upl_warn};
use url::Url;

use crate::types::map_reqwest_error;
use crate::{ApiError, FailureKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_download_bytes: u64,
    pub credentials: Option<BasicCredentials>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_download_bytes: 50 * 1024 * 1024,
            credentials: None,
        }
    }
}

/// Bytes headed for a signed upload URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBody {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    async fn settings(&self) -> Result<Settings, ApiError>;
    async fn update_settings(&self, settings: &Settings) -> Result<Settings, ApiError>;
    async fn projects(&self, cursor: Option<&str>) -> Result<Page<Project>, ApiError>;
    async fn create_project(&self, project: &NewProject) -> Result<Project, ApiError>;
    async fn project(&self, id: ProjectId) -> Result<Project, ApiError>;
    async fn update_project(&self, project: &Project) -> Result<Project, ApiError>;
    async fn delete_project(&self, id: ProjectId) -> Result<(), ApiError>;
    async fn status(&self, id: ProjectId) -> Result<ProjectStatus, ApiError>;
    async fn start_run(&self, id: ProjectId) -> Result<(), ApiError>;
    async fn cancel_run(&self, id: ProjectId) -> Result<(), ApiError>;
    async fn asset_upload_url(&self, id: ProjectId) -> Result<String, ApiError>;
    async fn feed(&self, id: ProjectId) -> Result<Vec<u8>, ApiError>;
    async fn log(&self, id: ProjectId, cursor: Option<&str>) -> Result<Page<LogEntry>, ApiError>;
    async fn upload(&self, url: &str, body: UploadBody) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
    base: Url,
    settings: ClientSettings,
}

impl ReqwestBackend {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let mut raw = settings.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme: {}", base.scheme()),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base,
            settings,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn project_endpoint(&self, id: ProjectId, tail: &str) -> Result<Url, ApiError> {
        if tail.is_empty() {
            self.endpoint(&format!("api/projects/{id}"))
        } else {
            self.endpoint(&format!("api/projects/{id}/{tail}"))
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.settings.credentials {
            Some(creds) => builder.basic_auth(&creds.username, Some(&creds.password)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        upl_debug!("GET {url}");
        let response = self.send(self.request(Method::GET, url)).await?;
        decode_json(response).await
    }

    async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        upl_debug!("{method} {url}");
        let response = self.send(self.request(method, url).json(body)).await?;
        decode_json(response).await
    }

    async fn send_empty(&self, method: Method, url: Url) -> Result<(), ApiError> {
        upl_debug!("{method} {url}");
        self.send(self.request(method, url)).await?;
        Ok(())
    }

    fn resolve_upload_url(&self, url: &str) -> Result<Url, ApiError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => self.endpoint(url.trim_start_matches('/')),
            Err(err) => Err(ApiError::new(FailureKind::InvalidUrl, err.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl BackendApi for ReqwestBackend {
    async fn settings(&self) -> Result<Settings, ApiError> {
        self.get_json(self.endpoint("api/settings")?).await
    }

    async fn update_settings(&self, settings: &Settings) -> Result<Settings, ApiError> {
        self.send_json(Method::PUT, self.endpoint("api/settings")?, settings)
            .await
    }

    async fn projects(&self, cursor: Option<&str>) -> Result<Page<Project>, ApiError> {
        let mut url = self.endpoint("api/projects")?;
        append_cursor(&mut url, "pc", cursor);
        self.get_json(url).await
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project, ApiError> {
        self.send_json(Method::POST, self.endpoint("api/projects")?, project)
            .await
    }

    async fn project(&self, id: ProjectId) -> Result<Project, ApiError> {
        self.get_json(self.project_endpoint(id, "")?).await
    }

    async fn update_project(&self, project: &Project) -> Result<Project, ApiError> {
        self.send_json(Method::PUT, self.project_endpoint(project.id, "")?, project)
            .await
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, self.project_endpoint(id, "")?)
            .await
    }

    async fn status(&self, id: ProjectId) -> Result<ProjectStatus, ApiError> {
        let report: StatusReport = self.get_json(self.project_endpoint(id, "status")?).await?;
        Ok(report.status)
    }

    async fn start_run(&self, id: ProjectId) -> Result<(), ApiError> {
        self.send_empty(Method::POST, self.project_endpoint(id, "run")?)
            .await
    }

    async fn cancel_run(&self, id: ProjectId) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, self.project_endpoint(id, "run")?)
            .await
    }

    async fn asset_upload_url(&self, id: ProjectId) -> Result<String, ApiError> {
        let ticket: UploadTicket = self
            .get_json(self.project_endpoint(id, "asset_upload_url")?)
            .await?;
        if ticket.upload_url.trim().is_empty() {
            return Err(ApiError::new(FailureKind::Decode, "empty upload url"));
        }
        Ok(ticket.upload_url)
    }

    async fn feed(&self, id: ProjectId) -> Result<Vec<u8>, ApiError> {
        let url = self.project_endpoint(id, "feed")?;
        upl_debug!("GET {url}");
        let response = self.send(self.request(Method::GET, url)).await?;
        read_limited(response, self.settings.max_download_bytes).await
    }

    async fn log(&self, id: ProjectId, cursor: Option<&str>) -> Result<Page<LogEntry>, ApiError> {
        let mut url = self.project_endpoint(id, "log")?;
        append_cursor(&mut url, "lc", cursor);
        self.get_json(url).await
    }

    async fn upload(&self, url: &str, body: UploadBody) -> Result<(), ApiError> {
        let target = self.resolve_upload_url(url)?;
        upl_debug!("POST {target} ({} bytes, {})", body.bytes.len(), body.file_name);
        let part = reqwest::multipart::Part::bytes(body.bytes)
            .file_name(body.file_name)
            .mime_str(&body.content_type)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        self.send(self.request(Method::POST, target).multipart(form))
            .await?;
        Ok(())
    }
}

fn append_cursor(url: &mut Url, key: &str, cursor: Option<&str>) {
    if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
        url.query_pairs_mut().append_pair(key, cursor);
    }
}

pub(crate) async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    upl_warn!("request failed with {status}: {}", body.trim());
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    };
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::new(FailureKind::Unauthorized, message));
    }
    Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), message))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

pub(crate) async fn read_limited(response: Response, max_bytes: u64) -> Result<Vec<u8>, ApiError> {
    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(ApiError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                },
                "response too large",
            ));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(ApiError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                },
                "response too large",
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
