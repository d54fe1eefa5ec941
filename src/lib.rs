//! Bookfetch is the transfer engine of a digital library downloader: it
//! fetches page images and documents over HTTP(S), concurrently, with
//! parallel byte-range transfers where the server allows them.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bookfetch::{DownloadManagerBuilder, Error};
//! use reqwest::Method;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let mut manager = DownloadManagerBuilder::new().concurrency(8).build()?;
//! manager.add_task(
//!     "https://example.com/books/1234/page-0001.jpg",
//!     Method::GET,
//!     None,
//!     None,
//!     "output/1234",
//!     "0001.jpg",
//!     4,
//! )?;
//! let report = manager.start().await;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`download`] - tasks, probing, chunk planning and the fetchers
//! - [`downloader`] - the [`DownloadManager`] and its builder and configuration
//! - [`queue`] - the bounded-parallelism [`Queue`] shared by tasks and chunks
//! - [`progress`] - transfer counters and progress bar display
//! - [`http`] - HTTP client with retry, tracing and cookie support
//! - [`error`] - centralized error handling with the [`Error`] enum
//! - [`utils`] - header parsing and file name helpers

pub mod download;
pub mod downloader;
pub mod error;
pub mod http;
pub mod progress;
pub mod queue;
pub mod utils;

pub use download::{DownloadTask, Phase, Report, RequestSpec, Status};
pub use downloader::{DownloadManager, DownloadManagerBuilder, DownloaderConfig};
pub use error::{Error, Result};
pub use http::{create_http_client, CookieSource, HttpClientConfig};
pub use progress::{ProgressBarOpts, StyleOptions};
pub use queue::Queue;
