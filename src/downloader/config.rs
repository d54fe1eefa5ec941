//! Configuration structures and defaults for the download manager.
//!
//! [`DownloaderConfig`] holds every option of a
//! [`DownloadManager`](super::DownloadManager). It is usually filled through
//! the [`DownloadManagerBuilder`](super::DownloadManagerBuilder), but can
//! be built directly with struct update syntax.
//!
//! # Examples
//!
//! ## Using Callbacks
//!
//! ```rust
//! use bookfetch::downloader::DownloadCallback;
//! use bookfetch::download::{DownloadTask, Status};
//!
//! let callback: DownloadCallback = Box::new(|task: &DownloadTask| {
//!     match task.status() {
//!         Status::Success => println!("Downloaded: {}", task.display_name()),
//!         Status::Fail(msg) => println!("Failed: {} - {}", task.display_name(), msg),
//!         Status::Skipped(reason) => println!("Skipped: {} - {}", task.display_name(), reason),
//!         _ => {}
//!     }
//! });
//! ```
//!
//! ## Tuning Transfers
//!
//! ```rust
//! use bookfetch::downloader::DownloaderConfig;
//! use std::time::Duration;
//!
//! let config = DownloaderConfig {
//!     concurrency: 4,
//!     max_threads: 8,
//!     retries: 5,
//!     sleep: Duration::from_millis(250),
//!     ..DownloaderConfig::default()
//! };
//! assert_eq!(config.timeout, Duration::from_secs(300));
//! ```

use crate::download::DownloadTask;
use crate::http::{CookieSource, HttpClientConfig, DEFAULT_USER_AGENT};
use crate::StyleOptions;

use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;

/// Callback type for task completion events.
pub type DownloadCallback = Box<dyn Fn(&DownloadTask) + Send + Sync>;

/// Configuration structure for the download manager.
#[derive(Clone)]
pub struct DownloaderConfig {
    /// Number of tasks transferring at the same time.
    pub concurrency: usize,
    /// Upper bound for the per-task number of range requests.
    pub max_threads: usize,
    /// Smallest chunk a parallel transfer is split into.
    pub min_chunk_size: Option<u64>,
    /// Largest chunk a parallel transfer is split into.
    pub max_chunk_size: Option<u64>,
    /// Deadline of a single request.
    pub timeout: Duration,
    /// Attempts per request on transport failures.
    pub retries: u32,
    /// Lower bound of the backoff between attempts.
    pub retry_interval: Duration,
    /// Download again even when the destination file exists.
    pub overwrite: bool,
    /// Session cookies.
    pub cookie_source: Option<CookieSource>,
    /// Custom HTTP headers sent with every request.
    pub headers: Option<HeaderMap>,
    /// Optional proxy configuration.
    pub proxy: Option<reqwest::Proxy>,
    /// User agent header value.
    pub user_agent: String,
    /// Pause between two task submissions.
    pub sleep: Duration,
    /// Interval between two progress redraws.
    pub refresh_interval: Duration,
    /// Progress bar style options.
    pub style_options: StyleOptions,
    /// Callback for when each task completes.
    pub on_complete: Option<Arc<DownloadCallback>>,
}

impl DownloaderConfig {
    /// The HTTP layer part of this configuration.
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            retries: self.retries,
            retry_interval: self.retry_interval,
            timeout: self.timeout,
            proxy: self.proxy.clone(),
            headers: self.headers.clone(),
            user_agent: self.user_agent.clone(),
            cookie_source: self.cookie_source.clone(),
        }
    }
}

impl std::fmt::Debug for DownloaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloaderConfig")
            .field("concurrency", &self.concurrency)
            .field("max_threads", &self.max_threads)
            .field("min_chunk_size", &self.min_chunk_size)
            .field("max_chunk_size", &self.max_chunk_size)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_interval", &self.retry_interval)
            .field("overwrite", &self.overwrite)
            .field("cookie_source", &self.cookie_source)
            .field("headers", &self.headers)
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .field("sleep", &self.sleep)
            .field("refresh_interval", &self.refresh_interval)
            .field("style_options", &self.style_options)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_threads: 16,
            min_chunk_size: None,
            max_chunk_size: None,
            timeout: Duration::from_secs(300),
            retries: 3,
            retry_interval: Duration::from_secs(1),
            overwrite: false,
            cookie_source: None,
            headers: None,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sleep: Duration::ZERO,
            refresh_interval: Duration::from_millis(200),
            style_options: StyleOptions::default(),
            on_complete: None,
        }
    }
}
