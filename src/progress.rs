//! Terminal progress reporting for long-running batch stages.

use core::fmt;
use core::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};

/// Thin facade over an [`indicatif`] progress bar.
///
/// Constructed with a visibility delay: `Duration::MAX` keeps the bar hidden
/// forever (used when log output is enabled, so the two don't interleave).
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    hidden: bool,
}

impl ProgressReporter {
    const BAR_TEMPLATE: &'static str = "{prefix:>10} [{bar:40}] {pos}/{len} {msg}";
    const SPINNER_TEMPLATE: &'static str = "{prefix:>10} {spinner} {msg}";

    #[must_use]
    pub fn new(delay: Duration) -> Self {
        let hidden = delay == Duration::MAX;
        let bar = if hidden { ProgressBar::hidden() } else { ProgressBar::no_length() };

        if !hidden {
            bar.set_style(Self::spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
        }

        Self { bar, hidden }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(Self::BAR_TEMPLATE).expect("valid progress template")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template(Self::SPINNER_TEMPLATE).expect("valid progress template")
    }

    pub fn set_prefix(&self, prefix: &str) {
        self.bar.set_prefix(prefix.to_string());
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Switch to a determinate bar with a known amount of work.
    pub fn enable_determinate_mode(&self, len: u64) {
        if !self.hidden {
            self.bar.set_style(Self::bar_style());
            self.bar.set_length(len);
            self.bar.set_position(0);
        }
    }

    /// Switch to an indeterminate spinner.
    pub fn enable_indeterminate_mode(&self) {
        if !self.hidden {
            self.bar.set_style(Self::spinner_style());
            self.bar.unset_length();
        }
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Print a line above the bar without disrupting it.
    pub fn println(&self, msg: &str) {
        if self.hidden {
            eprintln!("{msg}");
        } else {
            self.bar.println(msg);
        }
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").field("hidden", &self.hidden).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_reporter_accepts_all_calls() {
        let progress = ProgressReporter::new(Duration::MAX);
        progress.set_prefix("Testing");
        progress.enable_determinate_mode(10);
        progress.inc();
        progress.set_message("halfway");
        progress.enable_indeterminate_mode();
        progress.finish_and_clear();
    }

    #[test]
    fn debug_impl_mentions_visibility() {
        let progress = ProgressReporter::new(Duration::MAX);
        assert!(format!("{progress:?}").contains("hidden"));
    }
}
