//! REST client for the upstream log-analysis API.
//!
//! The session lives in the client's cookie store. Every response passes
//! through [`ApiClient::check`], which is the one place a 401 becomes
//! [`ApiError::Unauthorized`].

use std::path::Path;
use std::time::Duration;

use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{
    AnomaliesPage, Credentials, Event, EventsPage, QueryRequest, QueryResult, Registration,
    UploadReceipt, UploadStatus, User,
};

/// Name of the cookie upstream sets on login.
pub const SESSION_COOKIE: &str = "session";

/// File extensions upstream ingests.
pub const UPLOAD_EXTENSIONS: &[&str] = &["log", "txt", "json"];

/// Largest log file accepted for upload.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated (HTTP 401)")]
    Unauthorized,

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unsupported file type: {path} (expected .log, .txt or .json)")]
    UnsupportedFile { path: String },

    #[error("{path} is {size} bytes, over the {limit} byte upload limit")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Anything that can hand out pages of events.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self, page: u32, per_page: u32) -> Result<EventsPage, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .user_agent(concat!("logdash/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        Self::check(response).await
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(url = %response.url(), "upstream rejected session");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // -- events & anomalies --------------------------------------------------

    pub async fn events(&self, page: u32, per_page: u32) -> Result<EventsPage, ApiError> {
        debug!(page, per_page, "fetching events");
        self.json(
            self.client
                .get(self.url("events"))
                .query(&[("page", page), ("perPage", per_page)]),
        )
        .await
    }

    pub async fn event(&self, id: i64) -> Result<Event, ApiError> {
        self.json(self.client.get(self.url(&format!("events/{}", id))))
            .await
    }

    pub async fn anomalies(&self, page: u32, per_page: u32) -> Result<AnomaliesPage, ApiError> {
        debug!(page, per_page, "fetching anomalies");
        self.json(
            self.client
                .get(self.url("anomalies"))
                .query(&[("page", page), ("perPage", per_page)]),
        )
        .await
    }

    // -- query & uploads -----------------------------------------------------

    /// Ask upstream to translate `prompt` to SQL and run it.
    pub async fn query(&self, prompt: &str) -> Result<QueryResult, ApiError> {
        let body = QueryRequest {
            prompt: prompt.trim().to_string(),
        };
        self.json(self.client.post(self.url("query")).json(&body))
            .await
    }

    /// Upload a log file as multipart field `file`.
    ///
    /// Only `.log`, `.txt` and `.json` files up to [`MAX_UPLOAD_BYTES`] are
    /// sent; anything else is rejected before the file is read.
    pub async fn upload(&self, path: &Path) -> Result<UploadReceipt, ApiError> {
        let display = path.display().to_string();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| UPLOAD_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            return Err(ApiError::UnsupportedFile { path: display });
        }

        let io_error = |source: std::io::Error| ApiError::Io {
            path: display.clone(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(io_error)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(ApiError::FileTooLarge {
                path: display.clone(),
                size,
                limit: MAX_UPLOAD_BYTES,
            });
        }
        let bytes = tokio::fs::read(path).await.map_err(io_error)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.log".to_string());
        debug!(%file_name, size = bytes.len(), "uploading log file");

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));
        self.json(self.client.post(self.url("uploads/")).multipart(form))
            .await
    }

    pub async fn upload_status(&self, upload_id: &str) -> Result<UploadStatus, ApiError> {
        self.json(
            self.client
                .get(self.url(&format!("uploads/{}/status", upload_id))),
        )
        .await
    }

    // -- auth ----------------------------------------------------------------

    /// Log in. Returns the session token upstream set, if it was visible.
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<String>, ApiError> {
        let response = self
            .send(self.client.post(self.url("auth/login")).json(credentials))
            .await?;
        let token = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.value().to_string());
        Ok(token)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("auth/logout"))).await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.json(self.client.get(self.url("auth/me"))).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        self.json(
            self.client
                .post(self.url("auth/register"))
                .json(registration),
        )
        .await
    }
}

#[async_trait::async_trait]
impl EventSource for ApiClient {
    async fn fetch_events(&self, page: u32, per_page: u32) -> Result<EventsPage, ApiError> {
        self.events(page, per_page).await
    }
}
