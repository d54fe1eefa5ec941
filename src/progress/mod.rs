//! Progress tracking and display.
//!
//! - `state` - atomic byte counters shared by every fetcher of a transfer
//! - `display` - indicatif bars and the polling tracker that redraws them
//! - `style` - bar templates and visibility options
//!
//! # Examples
//!
//! ```rust
//! use bookfetch::progress::{render_line, ProgressState};
//!
//! let state = ProgressState::new(0);
//! state.add(2048);
//! // Unknown size: bytes only, no percentage.
//! assert!(render_line(&state, 0).starts_with("2.00 KiB"));
//! ```

pub(crate) mod display;
pub(crate) mod state;
pub(crate) mod style;

pub use display::{ProgressDisplay, ProgressTracker};
pub use state::{render_line, ProgressState};
pub use style::{ProgressBarOpts, StyleOptions};
