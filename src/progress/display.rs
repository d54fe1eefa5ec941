//! Progress bar display management.
//!
//! [`ProgressDisplay`] owns the indicatif [`MultiProgress`] of a batch: one
//! main bar counting finished tasks and one bar per running transfer. The
//! per-transfer bars are driven by polling rather than by events: a tracker
//! task wakes on a fixed interval, reads the transfer's [`ProgressState`]
//! and redraws, until the state is finished or the batch is cancelled.

use super::state::{render_line, ProgressState};
use super::StyleOptions;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Progress display manager that coordinates multiple progress bars.
pub struct ProgressDisplay {
    multi: Arc<MultiProgress>,
    main: ProgressBar,
    style_options: StyleOptions,
    refresh_interval: Duration,
}

impl std::fmt::Debug for ProgressDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressDisplay")
            .field("style_options", &self.style_options)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

impl ProgressDisplay {
    /// Create a display for `total_tasks` tasks, redrawn every
    /// `refresh_interval`.
    pub fn new(style_options: StyleOptions, total_tasks: usize, refresh_interval: Duration) -> Self {
        let multi = match style_options.is_enabled() {
            true => Arc::new(MultiProgress::new()),
            false => Arc::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden())),
        };

        let main = multi.add(style_options.main().to_progress_bar(total_tasks as u64));
        main.tick();

        Self {
            multi,
            main,
            style_options,
            refresh_interval: refresh_interval.max(Duration::from_millis(10)),
        }
    }

    /// Interval between two redraws of a transfer bar.
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Start tracking a transfer named `name`.
    pub fn track(
        &self,
        name: &str,
        state: Arc<ProgressState>,
        cancel: CancellationToken,
    ) -> ProgressTracker {
        let child = self.style_options.child();
        let bar = self.multi.add(child.to_progress_bar(state.total()));
        bar.set_prefix(name.to_string());

        let handle = tokio::spawn(poll(
            bar,
            state.clone(),
            self.refresh_interval,
            child.clear,
            child.to_unknown_size_style(),
            cancel,
        ));

        ProgressTracker { state, handle }
    }

    /// Print a line above the bars without garbling them.
    pub fn println(&self, line: impl AsRef<str>) {
        if self.style_options.is_enabled() {
            let _ = self.multi.println(line);
        }
    }

    /// Advance the task counter by one.
    pub fn increment_main(&self) {
        self.main.inc(1);
    }

    /// Finish the main bar, clearing or keeping it based on configuration.
    pub fn finish(&self) {
        if self.style_options.main().clear {
            self.main.finish_and_clear();
        } else {
            self.main.finish();
        }
    }
}

/// Handle on a running tracker.
#[derive(Debug)]
pub struct ProgressTracker {
    state: Arc<ProgressState>,
    handle: JoinHandle<()>,
}

impl ProgressTracker {
    /// The counters this tracker renders.
    pub fn state(&self) -> &Arc<ProgressState> {
        &self.state
    }

    /// Mark the transfer finished and wait for the final redraw.
    pub async fn finish(self) {
        self.state.finish();
        let _ = self.handle.await;
    }
}

async fn poll(
    bar: ProgressBar,
    state: Arc<ProgressState>,
    interval: Duration,
    clear: bool,
    unknown_style: indicatif::ProgressStyle,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut unknown_size = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let total = state.total();
        if total == 0 && !unknown_size {
            bar.set_style(unknown_style.clone());
            unknown_size = true;
        } else if total > 0 {
            bar.set_length(total);
        }
        bar.set_position(state.downloaded());
        bar.set_message(render_line(&state, state.sample(interval)));

        if state.is_finished() {
            break;
        }
    }

    if clear {
        bar.finish_and_clear();
    } else {
        bar.finish();
    }
}
