//! Streaming multipart upload bodies with progress reporting.
//!
//! # Design
//! - Files are streamed in fixed-size chunks; nothing larger than one chunk is
//!   held in memory.
//! - Progress is reported as whole percentages of bytes handed to the
//!   transport, and the callback fires only when the percentage changes.
//! - Each chunk handed over stamps an [`ActivityClock`]; a transfer fails as
//!   stalled only after a full timeout passes with no chunk moving.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures_util::stream;
use reqwest::Body;
use reqwest::multipart::Part;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{ClientError, ClientResult};

const CHUNK_SIZE: usize = 256 * 1024;
const FALLBACK_MIME: &str = "application/octet-stream";

/// Progress callback receiving whole percentages in `0..=100`.
pub type ProgressFn = Box<dyn FnMut(u8) + Send + 'static>;

/// A local file prepared for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    /// Location on disk.
    pub path: PathBuf,
    /// File name sent in the multipart part.
    pub file_name: String,
    /// MIME type guessed from the extension.
    pub mime: String,
    /// Size in bytes at inspection time.
    pub size: u64,
}

impl UploadSource {
    /// Stat a local file and guess its MIME type.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when the file cannot be read or is not a regular file.
    pub async fn inspect(path: &Path) -> ClientResult<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| io_error("upload.inspect", path, source))?;
        if !metadata.is_file() {
            return Err(io_error(
                "upload.inspect",
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(FALLBACK_MIME)
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            mime,
            size: metadata.len(),
        })
    }

    /// Lowercase extension without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

/// Last time a streaming transfer moved bytes.
#[derive(Debug, Clone)]
pub(crate) struct ActivityClock {
    started: Instant,
    last_millis: Arc<AtomicU64>,
}

impl ActivityClock {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
            last_millis: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn touch(&self) {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_millis.fetch_max(elapsed, Ordering::Relaxed);
    }

    pub(crate) fn idle(&self) -> Duration {
        let last = Duration::from_millis(self.last_millis.load(Ordering::Relaxed));
        self.started.elapsed().saturating_sub(last)
    }
}

/// Drive `work` until it finishes or `clock` stays idle for `limit`.
///
/// Returns the idle time on a stall.
pub(crate) async fn until_stalled<F: Future>(
    clock: &ActivityClock,
    limit: Duration,
    work: F,
) -> Result<F::Output, Duration> {
    tokio::pin!(work);
    loop {
        let wait = limit.saturating_sub(clock.idle());
        tokio::select! {
            output = &mut work => return Ok(output),
            () = tokio::time::sleep(wait) => {
                let idle = clock.idle();
                if idle >= limit {
                    return Err(idle);
                }
            }
        }
    }
}

/// Build a streaming multipart part for `source`, stamping `clock` per chunk.
pub(crate) async fn file_part(
    source: &UploadSource,
    progress: ProgressFn,
    clock: ActivityClock,
) -> ClientResult<Part> {
    let file = File::open(&source.path)
        .await
        .map_err(|err| io_error("upload.open", &source.path, err))?;
    let tracker = ProgressTracker::new(source.size, progress);

    let chunks = stream::unfold(Some((file, tracker, clock)), |state| async move {
        let (mut file, mut tracker, clock) = state?;
        let mut buffer = vec![0_u8; CHUNK_SIZE];
        match file.read(&mut buffer).await {
            Ok(0) => {
                tracker.finish();
                None
            }
            Ok(read) => {
                clock.touch();
                buffer.truncate(read);
                tracker.advance(read as u64);
                Some((Ok(buffer), Some((file, tracker, clock))))
            }
            Err(err) => Some((Err(err), None)),
        }
    });

    Part::stream_with_length(Body::wrap_stream(chunks), source.size)
        .file_name(source.file_name.clone())
        .mime_str(&source.mime)
        .map_err(|source| ClientError::Transport {
            operation: "upload.part",
            source,
        })
}

struct ProgressTracker {
    sent: u64,
    total: u64,
    last: Option<u8>,
    callback: ProgressFn,
}

impl ProgressTracker {
    fn new(total: u64, callback: ProgressFn) -> Self {
        Self {
            sent: 0,
            total,
            last: None,
            callback,
        }
    }

    fn advance(&mut self, read: u64) {
        self.sent = self.sent.saturating_add(read);
        self.emit(percent(self.sent, self.total));
    }

    fn finish(&mut self) {
        self.emit(100);
    }

    fn emit(&mut self, value: u8) {
        if self.last.is_none_or(|last| value > last) {
            self.last = Some(value);
            (self.callback)(value);
        }
    }
}

/// Whole percentage of `sent` over `total`, clamped to 100.
pub(crate) fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let scaled = u128::from(sent.min(total)) * 100 / u128::from(total);
    u8::try_from(scaled).unwrap_or(100)
}

fn io_error(operation: &'static str, path: &Path, source: std::io::Error) -> ClientError {
    ClientError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}
