//! Backend REST client.
//!
//! # Design
//! - Every method takes the bearer token as an argument; the client never
//!   stores one.
//! - Non-success responses are classified once in [`ApiClient::send`], pulling
//!   the FastAPI `detail` message when the body carries one.
//! - JSON calls are bounded by the configured timeout end to end. Uploads and
//!   downloads only fail once they stop moving bytes for that long.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use gma_api_models::{
    DeleteAck, DoctorProfile, ProblemDetails, ProfileUpsert, TestRecord, TestSubmission,
    VideoRecord, VideoRename,
};
use gma_config::DashboardConfig;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::upload::{ActivityClock, ProgressFn, UploadSource, file_part, until_stalled};

/// Listing window for `GET /api/uploads/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Records to skip.
    pub skip: u32,
    /// Maximum records to return.
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Where the bytes were written.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
}

/// Client for the classification backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl ApiClient {
    /// Build a client with the given base URL and network timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the HTTP client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                operation: "client.build",
                source,
            })?;
        Ok(Self::with_client(http, base_url, timeout))
    }

    /// Build a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the HTTP client cannot be constructed.
    pub fn from_config(config: &DashboardConfig) -> ClientResult<Self> {
        Self::new(config.api_url.clone(), config.http_timeout)
    }

    /// Wrap an existing `reqwest` client.
    #[must_use]
    pub fn with_client(http: Client, mut base_url: Url, timeout: Duration) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http,
            base_url,
            timeout,
        }
    }

    /// Configured base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /api/uploads/`.
    ///
    /// # Errors
    ///
    /// Returns transport, status or decode errors.
    pub async fn list_videos(&self, token: &str, page: Page) -> ClientResult<Vec<VideoRecord>> {
        const OP: &str = "uploads.list";
        let url = self.endpoint(OP, "api/uploads/")?;
        let request = self
            .http
            .get(url)
            .query(&[("skip", page.skip), ("limit", page.limit)]);
        let response = self.send(OP, token, request).await?;
        decode(OP, response).await
    }

    /// `POST /api/uploads/` with one file streamed under the `files` field.
    ///
    /// # Errors
    ///
    /// Returns IO errors for the local file, plus transport, status or decode
    /// errors; [`ClientError::UnexpectedResponse`] when the backend returns no record.
    pub async fn upload_video(
        &self,
        token: &str,
        source: &UploadSource,
        progress: ProgressFn,
    ) -> ClientResult<VideoRecord> {
        const OP: &str = "uploads.create";
        let url = self.endpoint(OP, "api/uploads/")?;
        let clock = ActivityClock::start();
        let form = Form::new().part("files", file_part(source, progress, clock.clone()).await?);
        let request = self.http.post(url).multipart(form);
        let exchange = async {
            let response = self.dispatch(OP, token, request).await?;
            decode::<Vec<VideoRecord>>(OP, response).await
        };
        let mut records = until_stalled(&clock, self.timeout, exchange)
            .await
            .map_err(|idle| ClientError::Stalled {
                operation: OP,
                idle,
            })??;
        if records.is_empty() {
            return Err(ClientError::UnexpectedResponse {
                operation: OP,
                reason: "upload response contained no records",
            });
        }
        let record = records.swap_remove(0);
        info!(video_id = record.id, size = record.file_size, "upload stored");
        Ok(record)
    }

    /// `PUT /api/uploads/{id}` renaming the stored file.
    ///
    /// # Errors
    ///
    /// Returns transport, status or decode errors.
    pub async fn rename_video(
        &self,
        token: &str,
        id: i64,
        filename: &str,
    ) -> ClientResult<VideoRecord> {
        const OP: &str = "uploads.update";
        let url = self.endpoint(OP, &format!("api/uploads/{id}"))?;
        let body = VideoRename {
            filename: filename.to_string(),
        };
        let response = self.send(OP, token, self.http.put(url).json(&body)).await?;
        decode(OP, response).await
    }

    /// `DELETE /api/uploads/{id}`.
    ///
    /// # Errors
    ///
    /// Returns transport or status errors.
    pub async fn delete_video(&self, token: &str, id: i64) -> ClientResult<DeleteAck> {
        const OP: &str = "uploads.delete";
        let url = self.endpoint(OP, &format!("api/uploads/{id}"))?;
        let response = self.send(OP, token, self.http.delete(url)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Decode {
                operation: OP,
                source,
            })?;
        Ok(serde_json::from_slice(&bytes).unwrap_or(DeleteAck {
            message: String::new(),
        }))
    }

    /// `GET /api/uploads/{id}/download`, streamed to disk.
    ///
    /// When `destination` is a directory the file name comes from the
    /// `Content-Disposition` header, then `fallback_name`, then `video-{id}.mp4`.
    ///
    /// # Errors
    ///
    /// Returns transport, status or IO errors.
    pub async fn download_video(
        &self,
        token: &str,
        id: i64,
        destination: &Path,
        fallback_name: Option<&str>,
    ) -> ClientResult<DownloadedFile> {
        const OP: &str = "uploads.download";
        let url = self.endpoint(OP, &format!("api/uploads/{id}/download"))?;
        let clock = ActivityClock::start();
        let request = self.dispatch(OP, token, self.http.get(url));
        let response = until_stalled(&clock, self.timeout, request)
            .await
            .map_err(|idle| ClientError::Stalled {
                operation: OP,
                idle,
            })??;

        let target = if destination.is_dir() {
            let name = response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok())
                .and_then(disposition_filename)
                .or_else(|| fallback_name.and_then(sanitize_file_name))
                .unwrap_or_else(|| format!("video-{id}.mp4"));
            destination.join(name)
        } else {
            destination.to_path_buf()
        };

        match self.write_body(OP, response, &target).await {
            Ok(bytes) => Ok(DownloadedFile {
                path: target,
                bytes,
            }),
            Err(err) => {
                if let Err(cleanup) = tokio::fs::remove_file(&target).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(path = %target.display(), error = %cleanup, "partial download left on disk");
                }
                Err(err)
            }
        }
    }

    async fn write_body(
        &self,
        operation: &'static str,
        response: Response,
        target: &Path,
    ) -> ClientResult<u64> {
        let mut file = tokio::fs::File::create(target)
            .await
            .map_err(|source| io_error(operation, target, source))?;
        let mut written = 0_u64;
        let mut body = response.bytes_stream();
        loop {
            let next = tokio::time::timeout(self.timeout, body.next())
                .await
                .map_err(|_| ClientError::Stalled {
                    operation,
                    idle: self.timeout,
                })?;
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|source| ClientError::Transport { operation, source })?;
            file.write_all(&chunk)
                .await
                .map_err(|source| io_error(operation, target, source))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|source| io_error(operation, target, source))?;
        Ok(written)
    }

    /// `POST /api/tests/{instant,full}`.
    ///
    /// # Errors
    ///
    /// Returns transport, status or decode errors.
    pub async fn submit_test(
        &self,
        token: &str,
        submission: &TestSubmission,
    ) -> ClientResult<TestRecord> {
        const OP: &str = "tests.submit";
        let url = self.endpoint(OP, submission.test_type.endpoint().trim_start_matches('/'))?;
        let response = self
            .send(OP, token, self.http.post(url).json(submission))
            .await?;
        decode(OP, response).await
    }

    /// `GET /api/tests/history`.
    ///
    /// # Errors
    ///
    /// Returns transport, status or decode errors.
    pub async fn test_history(&self, token: &str) -> ClientResult<Vec<TestRecord>> {
        const OP: &str = "tests.history";
        let url = self.endpoint(OP, "api/tests/history")?;
        let response = self.send(OP, token, self.http.get(url)).await?;
        decode(OP, response).await
    }

    /// `GET /api/auth/profile`; a 404 means no profile exists yet.
    ///
    /// # Errors
    ///
    /// Returns transport, non-404 status or decode errors.
    pub async fn get_profile(&self, token: &str) -> ClientResult<Option<DoctorProfile>> {
        const OP: &str = "profile.get";
        let url = self.endpoint(OP, "api/auth/profile")?;
        match self.send(OP, token, self.http.get(url)).await {
            Ok(response) => decode(OP, response).await.map(Some),
            Err(ClientError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// `POST /api/auth/profile` (create or update).
    ///
    /// # Errors
    ///
    /// Returns transport, status or decode errors.
    pub async fn upsert_profile(
        &self,
        token: &str,
        body: &ProfileUpsert,
    ) -> ClientResult<DoctorProfile> {
        const OP: &str = "profile.upsert";
        let url = self.endpoint(OP, "api/auth/profile")?;
        let response = self.send(OP, token, self.http.post(url).json(body)).await?;
        decode(OP, response).await
    }

    fn endpoint(&self, operation: &'static str, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::Url { operation, source })
    }

    async fn send(
        &self,
        operation: &'static str,
        token: &str,
        request: RequestBuilder,
    ) -> ClientResult<Response> {
        self.dispatch(operation, token, request.timeout(self.timeout))
            .await
    }

    async fn dispatch(
        &self,
        operation: &'static str,
        token: &str,
        request: RequestBuilder,
    ) -> ClientResult<Response> {
        if token.is_empty() {
            return Err(ClientError::Unauthenticated);
        }
        debug!(
            operation,
            command = gma_telemetry::current_command().as_deref().unwrap_or("-"),
            "backend request"
        );
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(classify_status(operation, response).await)
        }
    }
}

async fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> ClientResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| ClientError::Decode { operation, source })
}

async fn classify_status(operation: &'static str, response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = ProblemDetails::message_from_body(&body).or_else(|| {
        let trimmed = body.trim();
        (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
    });
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        debug!(operation, %status, "backend refused credentials");
    }
    ClientError::Status {
        operation,
        status,
        detail,
    }
}

/// Extract a safe file name from a `Content-Disposition` header value.
pub(crate) fn disposition_filename(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("filename")
                .then(|| value.trim().trim_matches('"').to_string())
        })
        .and_then(|name| sanitize_file_name(&name))
}

fn sanitize_file_name(name: &str) -> Option<String> {
    Path::new(name.trim())
        .file_name()
        .map(|base| base.to_string_lossy().into_owned())
        .filter(|base| !base.is_empty())
}

fn io_error(operation: &'static str, path: &Path, source: std::io::Error) -> ClientError {
    ClientError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}
