//! Progress reporting module

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for batch tabulation
pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
    quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new(quiet: bool) -> Self {
        Self {
            progress_bar: None,
            quiet,
        }
    }

    /// Initialize progress bar for `total_entries` entries
    pub fn init_entries(&mut self, total_entries: u64) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total_entries);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} entries {msg}")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        pb.enable_steady_tick(Duration::from_millis(100));

        self.progress_bar = Some(pb);
    }

    /// Update progress for a completed entry
    pub fn entry_completed(&self, gloss: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("Tabulated: {}", gloss));
            pb.inc(1);
        }
    }

    /// Finish progress reporting
    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message("Complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_reporter_has_no_bar() {
        let mut reporter = ProgressReporter::new(true);
        reporter.init_entries(10);
        assert!(reporter.progress_bar.is_none());
        reporter.entry_completed("father");
        reporter.finish();
    }

    #[test]
    fn test_bar_counts_entries() {
        let mut reporter = ProgressReporter::new(false);
        reporter.init_entries(2);
        reporter.entry_completed("father");
        assert_eq!(reporter.progress_bar.as_ref().map(|pb| pb.position()), Some(1));
        reporter.finish();
    }
}
