//! Progress bar styling options.
//!
//! The main bar counts finished tasks. Each child bar follows one transfer
//! and shows the status line produced by
//! [`render_line`](super::state::render_line) as its message. Transfers of
//! unknown size switch to a spinner since there is nothing to fill.
//!
//! ```rust
//! use bookfetch::progress::{ProgressBarOpts, StyleOptions};
//!
//! let quiet = StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden());
//! assert!(!quiet.is_enabled());
//! ```

use indicatif::{ProgressBar, ProgressStyle};

/// Define the style of the main bar and of the per-task bars.
///
/// By default the main bar stays on screen once the batch is done while
/// the per-task bars are cleared as each transfer completes.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub(crate) main: ProgressBarOpts,
    pub(crate) child: ProgressBarOpts,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            main: ProgressBarOpts {
                template: Some(ProgressBarOpts::TEMPLATE_TASKS.into()),
                progress_chars: Some(ProgressBarOpts::CHARS_FINE.into()),
                enabled: true,
                clear: false,
            },
            child: ProgressBarOpts::default(),
        }
    }
}

impl StyleOptions {
    /// Create new [`StyleOptions`].
    pub fn new(main: ProgressBarOpts, child: ProgressBarOpts) -> Self {
        Self { main, child }
    }

    /// Return `false` if neither the main nor the child bar is enabled.
    pub fn is_enabled(&self) -> bool {
        self.main.enabled || self.child.enabled
    }

    /// Options of the task counter bar.
    pub fn main(&self) -> &ProgressBarOpts {
        &self.main
    }

    /// Options of the per-transfer bars.
    pub fn child(&self) -> &ProgressBarOpts {
        &self.child
    }
}

/// Define the options for a progress bar.
#[derive(Debug, Clone)]
pub struct ProgressBarOpts {
    template: Option<String>,
    /// At least 3 characters: "filled", "current" and "to do".
    progress_chars: Option<String>,
    pub(crate) enabled: bool,
    pub(crate) clear: bool,
}

impl Default for ProgressBarOpts {
    fn default() -> Self {
        Self {
            template: Some(ProgressBarOpts::TEMPLATE_TRANSFER.into()),
            progress_chars: Some(ProgressBarOpts::CHARS_LINE.into()),
            enabled: true,
            clear: true,
        }
    }
}

impl ProgressBarOpts {
    /// Task counter: `█████████▌      11/24 (45%) eta 00:01:02`
    pub const TEMPLATE_TASKS: &'static str =
        "{bar:40.blue} {pos:>}/{len} ({percent}%) eta {eta_precise:.blue}";
    /// Transfer with known size; the message carries the status line.
    pub const TEMPLATE_TRANSFER: &'static str = "{prefix:.bold} {bar:30.green/black} {msg}";
    /// Transfer of unknown size.
    pub const TEMPLATE_UNKNOWN: &'static str = "{prefix:.bold} {spinner:.green} {msg}";
    /// Use fine blocks as progress characters: `"█▉▊▋▌▍▎▏  "`.
    pub const CHARS_FINE: &'static str = "█▉▊▋▌▍▎▏  ";
    /// Use a line as progress characters: `"━╾─"`.
    pub const CHARS_LINE: &'static str = "━╾╴─";

    /// Create a new [`ProgressBarOpts`].
    pub fn new(
        template: Option<String>,
        progress_chars: Option<String>,
        enabled: bool,
        clear: bool,
    ) -> Self {
        Self {
            template,
            progress_chars,
            enabled,
            clear,
        }
    }

    /// Create a new [`ProgressBarOpts`] which hides the progress bars.
    pub fn hidden() -> Self {
        Self {
            enabled: false,
            ..ProgressBarOpts::default()
        }
    }

    /// Set to `true` to clear the progress bar upon completion.
    pub fn set_clear(&mut self, clear: bool) {
        self.clear = clear;
    }

    /// Create a [`ProgressStyle`] from these options. An invalid template
    /// falls back to indicatif's default bar.
    pub fn to_progress_style(&self) -> ProgressStyle {
        let style = match &self.template {
            Some(template) => ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            None => ProgressStyle::default_bar(),
        };
        match &self.progress_chars {
            Some(chars) => style.progress_chars(chars),
            None => style,
        }
    }

    /// Style used once a transfer turns out to have no known size.
    pub fn to_unknown_size_style(&self) -> ProgressStyle {
        ProgressStyle::with_template(Self::TEMPLATE_UNKNOWN)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Create a [`ProgressBar`] of length `len`, hidden when disabled.
    pub fn to_progress_bar(&self, len: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }
        ProgressBar::new(len).with_style(self.to_progress_style())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar() {
        let pb = ProgressBarOpts::hidden().to_progress_bar(10);
        assert!(pb.is_hidden());
    }

    #[test]
    fn test_invalid_template_falls_back() {
        let opts = ProgressBarOpts::new(Some("{bar:abc".into()), None, true, true);
        let _style = opts.to_progress_style();
    }
}
