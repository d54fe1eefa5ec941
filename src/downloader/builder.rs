//! Builder pattern implementation for creating [`DownloadManager`] instances.
//!
//! # Examples
//!
//! ## Basic Builder Usage
//!
//! ```rust
//! use bookfetch::downloader::DownloadManagerBuilder;
//! use std::time::Duration;
//!
//! # fn example() -> bookfetch::Result<()> {
//! let manager = DownloadManagerBuilder::new()
//!     .concurrency(4)
//!     .retries(5)
//!     .timeout(Duration::from_secs(60))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Session Cookies and Headers
//!
//! ```rust,no_run
//! use bookfetch::downloader::DownloadManagerBuilder;
//! use bookfetch::http::CookieSource;
//! use reqwest::header::{HeaderValue, REFERER};
//!
//! # fn example() -> bookfetch::Result<()> {
//! let manager = DownloadManagerBuilder::new()
//!     .cookie_source(CookieSource::File("cookies.txt".into()))
//!     .header(REFERER, HeaderValue::from_static("https://example.com/"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use super::{config::DownloaderConfig, manager::DownloadManager};
use crate::download::DownloadTask;
use crate::http::CookieSource;
use crate::{ProgressBarOpts, StyleOptions};

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use std::sync::Arc;
use std::time::Duration;

/// A builder used to create a [`DownloadManager`].
///
/// ```rust
/// # fn main() -> bookfetch::Result<()> {
/// use bookfetch::downloader::DownloadManagerBuilder;
///
/// let manager = DownloadManagerBuilder::hidden().max_threads(4).build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct DownloadManagerBuilder {
    config: DownloaderConfig,
}

impl DownloadManagerBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloadManagerBuilder::default()
    }

    /// Convenience function to hide the progress bars.
    pub fn hidden() -> Self {
        let mut builder = DownloadManagerBuilder::default();
        builder.config.style_options =
            StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden());
        builder
    }

    /// Start from an existing configuration.
    pub fn with_config(config: DownloaderConfig) -> Self {
        Self { config }
    }

    /// Set the number of tasks transferring at the same time.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Set the upper bound of per-task range requests.
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        self.config.max_threads = max_threads.max(1);
        self
    }

    /// Set the smallest chunk size.
    pub fn min_chunk_size(mut self, size: u64) -> Self {
        self.config.min_chunk_size = Some(size);
        self
    }

    /// Set the largest chunk size.
    pub fn max_chunk_size(mut self, size: u64) -> Self {
        self.config.max_chunk_size = Some(size);
        self
    }

    /// Set the per-request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the number of attempts per request.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the lower bound of the backoff between attempts.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    /// Set whether to overwrite existing files.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    /// Set where session cookies come from.
    pub fn cookie_source(mut self, source: CookieSource) -> Self {
        self.config.cookie_source = Some(source);
        self
    }

    /// Route every request through `proxy`.
    pub fn proxy(mut self, proxy: reqwest::Proxy) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Pause between two task submissions.
    pub fn sleep(mut self, sleep: Duration) -> Self {
        self.config.sleep = sleep;
        self
    }

    /// Set the interval between two progress redraws.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.config.refresh_interval = interval;
        self
    }

    /// Set the progress bar style options.
    pub fn style_options(mut self, style_options: StyleOptions) -> Self {
        self.config.style_options = style_options;
        self
    }

    /// Set callback for when each task completes.
    ///
    /// The callback runs as soon as a task reaches its final status,
    /// whether it succeeded, failed or was skipped.
    ///
    /// ```rust
    /// use bookfetch::downloader::DownloadManagerBuilder;
    /// use bookfetch::download::Status;
    ///
    /// let builder = DownloadManagerBuilder::new().on_complete(|task| {
    ///     if let Status::Fail(error) = task.status() {
    ///         eprintln!("[Failed] {} - {}", task.display_name(), error);
    ///     }
    /// });
    /// ```
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DownloadTask) + Send + Sync + 'static,
    {
        self.config.on_complete = Some(Arc::new(Box::new(callback)));
        self
    }

    fn new_header(&self) -> HeaderMap {
        match self.config.headers {
            Some(ref h) => h.to_owned(),
            _ => HeaderMap::new(),
        }
    }

    /// Add the http headers.
    ///
    /// You can call `.headers()` multiple times and all `HeaderMap` will be
    /// merged into a single one. See also [`header()`].
    ///
    /// [`header()`]: DownloadManagerBuilder::header
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.new_header();
        new.extend(headers);

        self.config.headers = Some(new);
        self
    }

    /// Add the http header.
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.new_header();

        new.insert(name, value);

        self.config.headers = Some(new);
        self
    }

    /// Create the [`DownloadManager`] with the specified options.
    ///
    /// Fails when the HTTP client cannot be built, for instance because the
    /// cookie file is unreadable.
    pub fn build(self) -> crate::Result<DownloadManager> {
        DownloadManager::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::REFERER;

    #[test]
    fn test_headers_are_merged() {
        let builder = DownloadManagerBuilder::new()
            .header(REFERER, HeaderValue::from_static("https://a.example/"))
            .headers(HeaderMap::from_iter([(
                reqwest::header::ACCEPT,
                HeaderValue::from_static("image/*"),
            )]));
        let headers = builder.config.headers.unwrap();
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_bounds_are_clamped() {
        let builder = DownloadManagerBuilder::new().concurrency(0).max_threads(0);
        assert_eq!(builder.config.concurrency, 1);
        assert_eq!(builder.config.max_threads, 1);
    }
}
