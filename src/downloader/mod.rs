//! Download manager, its builder and configuration.
//!
//! - `manager` - the [`DownloadManager`] scheduling tasks and driving transfers
//! - `builder` - [`DownloadManagerBuilder`] for configuring a manager
//! - `config` - [`DownloaderConfig`] and the completion callback type
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use bookfetch::downloader::DownloadManagerBuilder;
//! use bookfetch::download::DownloadTask;
//!
//! # async fn example() -> bookfetch::Result<()> {
//! let mut manager = DownloadManagerBuilder::new().build()?;
//! manager.push(DownloadTask::try_from("https://example.com/scan-001.jpg")?.with_threads(4));
//! manager.push(DownloadTask::try_from("https://example.com/scan-002.jpg")?.with_threads(4));
//!
//! let report = manager.start().await;
//! assert_eq!(report.tasks.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Hidden Progress Bars
//!
//! ```rust
//! use bookfetch::downloader::DownloadManagerBuilder;
//!
//! # fn example() -> bookfetch::Result<()> {
//! let manager = DownloadManagerBuilder::hidden().build()?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod manager;

pub use builder::DownloadManagerBuilder;
pub use config::{DownloadCallback, DownloaderConfig};
pub use manager::DownloadManager;
