//! Batch orchestration.
//!
//! The [`DownloadManager`] runs every submitted [`DownloadTask`] through
//! the same state machine:
//!
//! ```text
//! Pending -> Probing -> ParallelChunks | SingleStream -> Assembling -> Done
//! ```
//!
//! Bytes always land in `<final>.downloading` first. The temporary file is
//! renamed to its final name only once the transfer is complete, so a
//! failed task leaves at most the temporary file behind.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bookfetch::downloader::DownloadManagerBuilder;
//! use reqwest::Method;
//!
//! # #[tokio::main]
//! # async fn main() -> bookfetch::Result<()> {
//! let mut manager = DownloadManagerBuilder::new().concurrency(4).build()?;
//! for page in 1..=3 {
//!     manager.add_task(
//!         &format!("https://example.com/iiif/{page:04}/full/full/0/default.jpg"),
//!         Method::GET,
//!         None,
//!         None,
//!         "volume-1",
//!         &format!("{page:04}.jpg"),
//!         4,
//!     )?;
//! }
//! let report = manager.start().await;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

use super::config::DownloaderConfig;
use crate::download::{
    fetch_chunks, fetch_fresh, fetch_whole, plan_chunks, probe, temp_path, DownloadTask, Phase,
    Report, RequestSpec, ResourceInfo, Status, MIN_PARALLEL_SIZE,
};
use crate::error::{Error, Result};
use crate::http::create_http_client;
use crate::progress::{ProgressDisplay, ProgressState};
use crate::queue::{panic_message, Queue};
use crate::utils::{extension_for_mime, filename_from_url};

use futures::FutureExt;
use indicatif::HumanBytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, Response, Url};
use reqwest_middleware::ClientWithMiddleware;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Name used when neither the response nor the URL suggests one.
const FALLBACK_NAME: &str = "download";

/// Schedules download tasks and drives each of them to completion.
pub struct DownloadManager {
    config: DownloaderConfig,
    client: ClientWithMiddleware,
    tasks: Vec<DownloadTask>,
    succeeded: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadManager")
            .field("config", &self.config)
            .field("tasks", &self.tasks.len())
            .field("succeeded", &self.succeeded())
            .field("failed", &self.failed())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl DownloadManager {
    /// Creates a manager with the given configuration.
    pub(crate) fn new(config: DownloaderConfig) -> Result<Self> {
        let client = create_http_client(config.http_config())?;
        Ok(Self {
            config,
            client,
            tasks: Vec::new(),
            succeeded: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
        })
    }

    /// Gets the configuration.
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Gets the HTTP client shared by every task.
    pub fn client(&self) -> &ClientWithMiddleware {
        &self.client
    }

    /// Queue a download of `url` into `save_dir`.
    ///
    /// An empty `file_name` is resolved from the response or the URL once
    /// the resource has been probed. `threads` is clamped to
    /// `1..=max_threads`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_task(
        &mut self,
        url: &str,
        method: Method,
        headers: Option<HeaderMap>,
        body: Option<Vec<u8>>,
        save_dir: impl Into<PathBuf>,
        file_name: &str,
        threads: usize,
    ) -> Result<()> {
        let url = Url::parse(url)
            .map_err(|e| Error::InvalidUrl(format!("The url \"{url}\" cannot be parsed: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "The url \"{url}\" uses the unsupported scheme \"{}\"",
                url.scheme()
            )));
        }

        let request = RequestSpec {
            url,
            method,
            headers: headers.unwrap_or_default(),
            body,
        };
        self.push(DownloadTask::new(request, save_dir.into(), file_name, threads));
        Ok(())
    }

    /// Queue a prepared task.
    pub fn push(&mut self, mut task: DownloadTask) {
        task.threads = task.threads.clamp(1, self.config.max_threads.max(1));
        debug!("Queued {} ({} threads)", task.url(), task.threads);
        self.tasks.push(task);
    }

    /// Tasks waiting for [`DownloadManager::start`].
    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    /// Number of tasks that succeeded or were skipped so far.
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Number of tasks that failed so far.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Stop the batch: no new task is started and running transfers give
    /// up at their next read.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observed by every transfer of this manager.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every queued task and wait for all of them.
    ///
    /// Failures are recorded per task and never stop the other tasks.
    pub async fn start(&mut self) -> Report {
        let started_at = Instant::now();
        let tasks = std::mem::take(&mut self.tasks);
        let total_tasks = tasks.len();

        let shared = Arc::new(Shared {
            config: self.config.clone(),
            client: self.client.clone(),
            display: ProgressDisplay::new(
                self.config.style_options.clone(),
                total_tasks,
                self.config.refresh_interval,
            ),
            aggregate: Arc::new(ProgressState::new(0)),
            succeeded: self.succeeded.clone(),
            failed: self.failed.clone(),
            cancel: self.cancel.clone(),
        });

        let mut slots: Vec<Option<DownloadTask>> = vec![None; total_tasks];
        let mut scheduled: Vec<Option<DownloadTask>> = vec![None; total_tasks];
        let mut queue = Queue::new(self.config.concurrency);

        for (index, task) in tasks.into_iter().enumerate() {
            if index > 0 && !self.config.sleep.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.config.sleep) => {}
                }
            }
            if self.cancel.is_cancelled() {
                slots[index] = Some(shared.conclude(task, Err(Error::Cancelled)));
                continue;
            }

            scheduled[index] = Some(task.clone());
            let worker = shared.clone();
            let work = async move {
                let finished = AssertUnwindSafe(worker.run(task)).catch_unwind().await;
                (index, finished.map_err(|payload| Error::Panicked(panic_message(payload))))
            };
            if let Err(e) = queue.go(work).await {
                warn!("Could not schedule task {}: {}", index, e);
            }
        }

        let mut lost = Vec::new();
        for result in queue.wait().await {
            match result {
                Ok((index, Ok(task))) => slots[index] = Some(task),
                Ok((index, Err(e))) => lost.push((index, e)),
                Err(e) => warn!("Download worker lost: {}", e),
            }
        }

        // The worker died after its task was counted, so only the status is
        // recorded here.
        for (index, error) in lost {
            if let Some(mut task) = scheduled[index].take() {
                warn!("Task {} panicked: {}", task.url(), error);
                task.set_status(Status::Fail(error.to_string()));
                slots[index] = Some(task);
            }
        }
        for (index, task) in scheduled.into_iter().enumerate() {
            if let Some(mut task) = task {
                if slots[index].is_none() {
                    let error = Error::Internal("task did not finish".into());
                    task.set_status(Status::Fail(error.to_string()));
                    slots[index] = Some(task);
                }
            }
        }

        shared.display.finish();

        let tasks: Vec<DownloadTask> = slots.into_iter().flatten().collect();
        let succeeded = tasks.iter().filter(|t| t.is_success()).count();
        let report = Report {
            succeeded,
            failed: tasks.len() - succeeded,
            elapsed: started_at.elapsed(),
            tasks,
        };

        info!(
            "{} ({} transferred)",
            report,
            HumanBytes(shared.aggregate.downloaded())
        );
        shared.display.println(report.to_string());
        report
    }
}

/// State shared by the workers of one batch.
struct Shared {
    config: DownloaderConfig,
    client: ClientWithMiddleware,
    display: ProgressDisplay,
    aggregate: Arc<ProgressState>,
    succeeded: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

/// How a transfer ended when it did not fail.
enum Outcome {
    Downloaded,
    Skipped(String),
}

impl Shared {
    async fn run(self: Arc<Self>, mut task: DownloadTask) -> DownloadTask {
        task.set_status(Status::Running);
        let result = match AssertUnwindSafe(self.transfer(&mut task)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(Error::Panicked(panic_message(payload))),
        };
        self.conclude(task, result)
    }

    /// Record the final status of `task`, update counters and notify.
    fn conclude(&self, mut task: DownloadTask, result: Result<Outcome>) -> DownloadTask {
        let status = match result {
            Ok(Outcome::Downloaded) => {
                debug!("Downloaded {} to {:?}", task.url(), task.path());
                Status::Success
            }
            Ok(Outcome::Skipped(reason)) => {
                debug!("Skipped {}: {}", task.url(), reason);
                Status::Skipped(reason)
            }
            Err(e) => {
                warn!("Failed to download {}: {}", task.url(), e);
                self.display
                    .println(format!("failed: {} ({})", task.display_name(), e));
                Status::Fail(e.to_string())
            }
        };

        match status.is_success() {
            true => self.succeeded.fetch_add(1, Ordering::Relaxed),
            false => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        task.set_status(status);
        self.display.increment_main();

        if let Some(ref callback) = self.config.on_complete {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(&task))) {
                warn!(
                    "Completion callback for {} panicked: {}",
                    task.url(),
                    panic_message(payload)
                );
            }
        }
        task
    }

    async fn transfer(&self, task: &mut DownloadTask) -> Result<Outcome> {
        if !task.file_name.is_empty() {
            let path = task.save_dir.join(&task.file_name);
            task.set_path(path.clone());
            if let Some(reason) = self.already_there(&path).await {
                return Ok(Outcome::Skipped(reason));
            }
        }

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        fs::create_dir_all(&task.save_dir).await?;

        let (info, response) = if task.request.method != Method::GET {
            debug!("{} {} goes straight to a single stream", task.request.method, task.url());
            (ResourceInfo::default(), None)
        } else {
            task.set_phase(Phase::Probing);
            match probe(&self.client, &task.request, &self.cancel).await {
                Ok(probe) => (probe.info, probe.response),
                Err(Error::UnknownSize) => {
                    debug!("Size of {} is unknown, using a fresh request", task.url());
                    (ResourceInfo::default(), None)
                }
                Err(e) => return Err(e),
            }
        };

        if task.file_name.is_empty() {
            let name = resolve_name(task.url(), &info);
            let path = task.save_dir.join(&name);
            task.file_name = name;
            task.set_path(path.clone());
            if let Some(reason) = self.already_there(&path).await {
                return Ok(Outcome::Skipped(reason));
            }
        }

        let path = task.save_dir.join(&task.file_name);
        let temp = temp_path(&path);
        task.set_total(info.size);

        let state = Arc::new(ProgressState::child(&self.aggregate));
        state.set_total(info.size);
        let tracker = self
            .display
            .track(&task.file_name, state.clone(), self.cancel.clone());
        let result = self.fetch(task, &info, response, &temp, &state).await;
        tracker.finish().await;
        let written = result?;

        task.set_size(written);
        task.set_phase(Phase::Assembling);
        debug!("Promoting {:?} to {:?}", temp, path);
        fs::rename(&temp, &path).await?;
        Ok(Outcome::Downloaded)
    }

    async fn fetch(
        &self,
        task: &mut DownloadTask,
        info: &ResourceInfo,
        response: Option<Response>,
        temp: &Path,
        state: &Arc<ProgressState>,
    ) -> Result<u64> {
        if let Some(res) = response {
            task.set_phase(Phase::SingleStream);
            let expected = (info.size > 0).then_some(info.size);
            return fetch_whole(res, temp, state, &self.cancel, expected).await;
        }

        if info.rangeable && task.threads > 1 && info.size >= MIN_PARALLEL_SIZE {
            task.set_phase(Phase::ParallelChunks);
            let chunks = plan_chunks(
                info.size,
                task.threads,
                self.config.min_chunk_size,
                self.config.max_chunk_size,
            );
            return fetch_chunks(
                &self.client,
                Arc::new(task.request.clone()),
                chunks,
                info.size,
                temp,
                task.threads,
                state.clone(),
                &self.cancel,
            )
            .await;
        }

        task.set_phase(Phase::SingleStream);
        let written = fetch_fresh(&self.client, &task.request, temp, state, &self.cancel).await?;
        task.set_total(state.total());
        Ok(written)
    }

    /// Reason to skip `path`, if a non-empty file is already there.
    async fn already_there(&self, path: &Path) -> Option<String> {
        if self.config.overwrite {
            return None;
        }
        match fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                Some(format!("{} already exists", path.display()))
            }
            _ => None,
        }
    }
}

/// File name for a task that did not set one.
fn resolve_name(url: &Url, info: &ResourceInfo) -> String {
    if let Some(name) = &info.file_name {
        return name.clone();
    }
    if let Some(name) = filename_from_url(url) {
        return name;
    }
    let ext = info
        .content_type
        .as_deref()
        .and_then(extension_for_mime)
        .unwrap_or_default();
    format!("{FALLBACK_NAME}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_name_precedence() {
        let info = ResourceInfo {
            file_name: Some("from-header.pdf".into()),
            content_type: Some("application/pdf".into()),
            ..ResourceInfo::default()
        };
        assert_eq!(resolve_name(&url("https://a.example/x/page.pdf"), &info), "from-header.pdf");

        let info = ResourceInfo {
            content_type: Some("image/jpeg".into()),
            ..ResourceInfo::default()
        };
        assert_eq!(resolve_name(&url("https://a.example/x/page.jpg"), &info), "page.jpg");
        assert_eq!(resolve_name(&url("https://a.example/x/"), &info), "download.jpg");
        assert_eq!(
            resolve_name(&url("https://a.example/"), &ResourceInfo::default()),
            "download"
        );
    }

    #[tokio::test]
    async fn test_add_task_validates_and_clamps() {
        let mut manager = crate::downloader::DownloadManagerBuilder::hidden()
            .max_threads(8)
            .build()
            .unwrap();
        assert!(matches!(
            manager.add_task("::nope::", Method::GET, None, None, "out", "a", 4),
            Err(Error::InvalidUrl(_))
        ));
        manager
            .add_task("https://a.example/a.jpg", Method::GET, None, None, "out", "a.jpg", 64)
            .unwrap();
        manager
            .add_task("https://a.example/b.jpg", Method::GET, None, None, "out", "", 0)
            .unwrap();
        assert_eq!(manager.tasks().len(), 2);
        assert_eq!(manager.tasks()[0].threads, 8);
        assert_eq!(manager.tasks()[1].threads, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_fails_every_task() {
        let mut manager = crate::downloader::DownloadManagerBuilder::hidden()
            .build()
            .unwrap();
        manager
            .add_task("http://127.0.0.1:9/a.jpg", Method::GET, None, None, "out", "a.jpg", 1)
            .unwrap();
        manager.cancel();
        let report = manager.start().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.tasks[0].status(), &Status::Fail("Download cancelled".into()));
        assert_eq!(manager.failed(), 1);
    }
}
