//! Shared transfer counters.
//!
//! A [`ProgressState`] is updated concurrently by every fetcher of a task
//! through atomic operations only. A state created with
//! [`ProgressState::child`] forwards each update to its parent, which gives
//! the download manager an aggregate view over all tasks.

use indicatif::{HumanBytes, HumanDuration};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Byte counters of one transfer (or of a whole batch).
#[derive(Debug)]
pub struct ProgressState {
    total: AtomicU64,
    downloaded: AtomicU64,
    last_sample: AtomicU64,
    finished: AtomicBool,
    started_at: Instant,
    parent: Option<Arc<ProgressState>>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ProgressState {
    /// Creates a state for a transfer of `total` bytes (0 = unknown).
    pub fn new(total: u64) -> Self {
        Self {
            total: AtomicU64::new(total),
            downloaded: AtomicU64::new(0),
            last_sample: AtomicU64::new(0),
            finished: AtomicBool::new(false),
            started_at: Instant::now(),
            parent: None,
        }
    }

    /// Creates a state whose updates also land in `parent`.
    pub fn child(parent: &Arc<ProgressState>) -> Self {
        Self {
            parent: Some(parent.clone()),
            ..Self::new(0)
        }
    }

    /// Records `n` more bytes.
    pub fn add(&self, n: u64) {
        self.downloaded.fetch_add(n, Ordering::Relaxed);
        if let Some(parent) = &self.parent {
            parent.add(n);
        }
    }

    /// Sets the expected size. The parent's total grows by the same amount.
    pub fn set_total(&self, total: u64) {
        let previous = self.total.swap(total, Ordering::Relaxed);
        if let Some(parent) = &self.parent {
            parent.grow_total(total.saturating_sub(previous));
        }
    }

    fn grow_total(&self, n: u64) {
        self.total.fetch_add(n, Ordering::Relaxed);
    }

    /// Expected size in bytes, 0 when unknown.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Bytes received so far.
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    /// Completion percentage, `None` when the total is unknown.
    pub fn percent(&self) -> Option<u64> {
        match self.total() {
            0 => None,
            total => Some((self.downloaded().min(total) * 100) / total),
        }
    }

    /// Time since the state was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average speed in bytes per second since the start.
    pub fn avg_speed(&self) -> u64 {
        let millis = self.elapsed().as_millis() as u64;
        if millis == 0 {
            return 0;
        }
        self.downloaded().saturating_mul(1000) / millis
    }

    /// Bytes per second since the previous sample, `interval` being the time
    /// between two samples. Each call starts a new sampling window.
    pub fn sample(&self, interval: Duration) -> u64 {
        let now = self.downloaded();
        let last = self.last_sample.swap(now, Ordering::Relaxed);
        let millis = interval.as_millis() as u64;
        if millis == 0 {
            return 0;
        }
        now.saturating_sub(last).saturating_mul(1000) / millis
    }

    /// Marks the transfer as done; trackers stop at their next wake-up.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Whether [`ProgressState::finish`] was called.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// One human readable status line for a transfer.
///
/// With a known total the line reads `42% 4.20 MiB/10.00 MiB 1.00 MiB/s
/// (avg 900.00 KiB/s) in 4s`; without one the percentage and total are
/// left out.
pub fn render_line(state: &ProgressState, speed: u64) -> String {
    let rates = format!(
        "{}/s (avg {}/s) in {}",
        HumanBytes(speed),
        HumanBytes(state.avg_speed()),
        HumanDuration(state.elapsed())
    );
    match state.percent() {
        Some(percent) => format!(
            "{}% {}/{} {}",
            percent,
            HumanBytes(state.downloaded()),
            HumanBytes(state.total()),
            rates
        ),
        None => format!("{} {}", HumanBytes(state.downloaded()), rates),
    }
}
