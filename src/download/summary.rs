//! Task status and batch report.
//!
//! Every [`DownloadTask`] carries a [`Status`] and a [`Phase`]. Once a batch
//! is over, the download manager hands back a [`Report`] whose `Display`
//! is the one-line completion summary.
//!
//! ```rust
//! use bookfetch::download::Status;
//!
//! let status = Status::Skipped("file already exists".into());
//! assert!(status.is_success());
//! assert!(status.is_final());
//! ```

use super::task::DownloadTask;

use std::fmt;
use std::time::Duration;

/// Download status enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Download not yet started
    NotStarted,
    /// Download in progress
    Running,
    /// Download completed successfully
    Success,
    /// Download was skipped with reason
    Skipped(String),
    /// Download failed with error message
    Fail(String),
}

impl Status {
    /// `Success` and `Skipped` both count as success.
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success | Status::Skipped(_))
    }

    /// Whether the status can no longer change.
    pub fn is_final(&self) -> bool {
        matches!(self, Status::Success | Status::Skipped(_) | Status::Fail(_))
    }
}

/// Where a task stands in its transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pending,
    Probing,
    ParallelChunks,
    SingleStream,
    Assembling,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Pending => "pending",
            Phase::Probing => "probing",
            Phase::ParallelChunks => "parallel chunks",
            Phase::SingleStream => "single stream",
            Phase::Assembling => "assembling",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a batch.
#[derive(Debug, Clone)]
pub struct Report {
    /// Tasks that were downloaded or skipped.
    pub succeeded: usize,
    /// Tasks that failed.
    pub failed: usize,
    /// Wall time of the batch.
    pub elapsed: Duration,
    /// Finished tasks, in submission order.
    pub tasks: Vec<DownloadTask>,
}

impl Report {
    /// Tasks that ended with [`Status::Fail`].
    pub fn failures(&self) -> impl Iterator<Item = &DownloadTask> {
        self.tasks.iter().filter(|t| !t.is_success())
    }

    /// Whether every task ended well.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Download finished! succeeded: {}, failed: {}, elapsed: {:.2}s",
            self.succeeded,
            self.failed,
            self.elapsed.as_secs_f64()
        )
    }
}
