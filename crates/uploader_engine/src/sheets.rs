use std::time::Duration;

use reqwest::Response;
use serde::Deserialize;
use uploader_logging::upl_debug;
use url::Url;

use crate::types::map_reqwest_error;
use crate::{ApiError, FailureKind};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3/";

/// Turns a Google Sheet into CSV text.
#[async_trait::async_trait]
pub trait SheetExporter: Send + Sync {
    async fn export_csv(&self, sheet_id: &str) -> Result<String, ApiError>;
}

#[derive(Debug, Clone)]
pub struct DriveSettings {
    pub api_base: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriveSheetExporter {
    client: reqwest::Client,
    api_base: Url,
    access_token: Option<String>,
}

impl DriveSheetExporter {
    pub fn new(settings: DriveSettings) -> Result<Self, ApiError> {
        let api_base = Url::parse(&settings.api_base)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if api_base.cannot_be_a_base() {
            return Err(ApiError::new(FailureKind::InvalidUrl, settings.api_base));
        }
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            api_base,
            access_token: settings.access_token,
        })
    }

    fn export_url(&self, sheet_id: &str) -> Result<Url, ApiError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, self.api_base.to_string()))?
            .pop_if_empty()
            .extend(["files", sheet_id, "export"]);
        url.query_pairs_mut().append_pair("mimeType", "text/csv");
        Ok(url)
    }
}

#[async_trait::async_trait]
impl SheetExporter for DriveSheetExporter {
    async fn export_csv(&self, sheet_id: &str) -> Result<String, ApiError> {
        let url = self.export_url(sheet_id)?;
        upl_debug!("exporting sheet {sheet_id}");
        let mut request = self.client.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        let response = check_drive_status(response).await?;
        response.text().await.map_err(map_reqwest_error)
    }
}

#[derive(Deserialize)]
struct DriveErrorBody {
    error: DriveErrorDetail,
}

#[derive(Deserialize)]
struct DriveErrorDetail {
    message: String,
}

/// Drive wraps failures as `{"error": {"message": ...}}`; that message is
/// what the user gets to see.
async fn check_drive_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<DriveErrorBody>(&body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| status.to_string());
    let kind = match status.as_u16() {
        401 | 403 => FailureKind::Unauthorized,
        code => FailureKind::HttpStatus(code),
    };
    Err(ApiError::new(kind, message))
}
