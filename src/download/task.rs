//! Download tasks.
//!
//! A [`DownloadTask`] is created by a site adapter, handed to the
//! [`DownloadManager`](crate::downloader::DownloadManager), and given back
//! in the batch [`Report`](super::Report) once it reached a final status.
//!
//! ```rust
//! use bookfetch::download::DownloadTask;
//! use std::path::PathBuf;
//!
//! let task = DownloadTask::try_from("https://example.com/iiif/0001/full/full/0/default.jpg")
//!     .unwrap()
//!     .with_save_dir(PathBuf::from("volume-1"))
//!     .with_file_name("0001.jpg")
//!     .with_threads(4);
//! assert_eq!(task.file_name, "0001.jpg");
//! ```

use super::summary::{Phase, Status};
use crate::error::{Error, Result};

use reqwest::header::{HeaderMap, RANGE};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use std::path::{Path, PathBuf};

/// Suffix of the file a transfer writes into until it is promoted.
pub const TEMP_SUFFIX: &str = ".downloading";

/// Everything needed to issue the task's HTTP request again.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RequestSpec {
    /// A plain `GET` of `url`.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// The request exactly as the task describes it.
    pub fn build(&self, client: &ClientWithMiddleware) -> RequestBuilder {
        let mut req = client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }
        req
    }

    /// A `HEAD` carrying the task's headers.
    pub fn head(&self, client: &ClientWithMiddleware) -> RequestBuilder {
        client
            .head(self.url.clone())
            .headers(self.headers.clone())
    }

    /// A `GET` for the bytes `range` (a full `bytes=a-b` value).
    pub fn ranged(&self, client: &ClientWithMiddleware, range: &str) -> RequestBuilder {
        client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .header(RANGE, range)
    }
}

/// A single file to download.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// Request used to fetch the resource.
    pub request: RequestSpec,
    /// Directory the file is saved into.
    pub save_dir: PathBuf,
    /// File name; empty means "derive it from the response or the URL".
    pub file_name: String,
    /// Number of concurrent range requests allowed for this file.
    pub threads: usize,
    status: Status,
    phase: Phase,
    size: u64,
    total: u64,
    path: Option<PathBuf>,
}

impl DownloadTask {
    /// Creates a task downloading `request` into `save_dir/file_name`.
    pub fn new(request: RequestSpec, save_dir: PathBuf, file_name: &str, threads: usize) -> Self {
        Self {
            request,
            save_dir,
            file_name: file_name.to_string(),
            threads: threads.max(1),
            status: Status::NotStarted,
            phase: Phase::Pending,
            size: 0,
            total: 0,
            path: None,
        }
    }

    /// Set the directory the file is saved into.
    pub fn with_save_dir(self, save_dir: PathBuf) -> Self {
        Self { save_dir, ..self }
    }

    /// Set an explicit file name.
    pub fn with_file_name(self, file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            ..self
        }
    }

    /// Set the number of concurrent range requests.
    pub fn with_threads(self, threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            ..self
        }
    }

    /// Target URL.
    pub fn url(&self) -> &Url {
        &self.request.url
    }

    /// Current status.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Current phase of the transfer state machine.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Bytes written for this task.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Size of the remote resource, 0 when unknown.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Final path, once it has been resolved.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Error text of a failed task.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            Status::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Whether the task ended well (downloaded or skipped).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Name used in progress lines and logs.
    pub fn display_name(&self) -> String {
        if !self.file_name.is_empty() {
            return self.file_name.clone();
        }
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.request.url.to_string())
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        if status.is_final() {
            self.phase = Phase::Done;
        }
        self.status = status;
    }

    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    pub(crate) fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }
}

/// Path of the temporary file backing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

impl TryFrom<&Url> for DownloadTask {
    type Error = Error;

    fn try_from(value: &Url) -> Result<Self> {
        match value.scheme() {
            "http" | "https" => Ok(DownloadTask::new(
                RequestSpec::get(value.clone()),
                PathBuf::new(),
                "",
                1,
            )),
            scheme => Err(Error::InvalidUrl(format!(
                "The url \"{value}\" uses the unsupported scheme \"{scheme}\""
            ))),
        }
    }
}

impl TryFrom<&str> for DownloadTask {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Url::parse(value)
            .map_err(|e| Error::InvalidUrl(format!("The url \"{value}\" cannot be parsed: {e}")))
            .and_then(|u| DownloadTask::try_from(&u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_rejects_bad_urls() {
        assert!(matches!(
            DownloadTask::try_from("not a url"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            DownloadTask::try_from("ftp://example.com/a.jpg"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_new_task_defaults() {
        let task = DownloadTask::try_from("https://example.com/a.jpg").unwrap();
        assert_eq!(task.status(), &Status::NotStarted);
        assert_eq!(task.phase(), Phase::Pending);
        assert_eq!(task.threads, 1);
        assert_eq!(task.request.method, Method::GET);
        assert!(task.path().is_none());
        assert_eq!(task.display_name(), "https://example.com/a.jpg");
    }

    #[test]
    fn test_final_status_moves_phase_to_done() {
        let mut task = DownloadTask::try_from("https://example.com/a.jpg").unwrap();
        task.set_phase(Phase::Probing);
        task.set_status(Status::Running);
        assert_eq!(task.phase(), Phase::Probing);
        task.set_status(Status::Fail("boom".into()));
        assert_eq!(task.phase(), Phase::Done);
        assert_eq!(task.error(), Some("boom"));
        assert!(!task.is_success());
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path(Path::new("/tmp/book/0001.jpg")),
            PathBuf::from("/tmp/book/0001.jpg.downloading")
        );
    }
}
