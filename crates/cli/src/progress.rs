//! Progress bar driven by migration events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use foldergit_core::observer::{MigrationEvent, MigrationObserver, TracingObserver};

/// Shows a per-folder progress bar and forwards every event to `tracing`.
pub struct ProgressObserver {
    bar: ProgressBar,
    inner: TracingObserver,
}

impl ProgressObserver {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self {
            bar,
            inner: TracingObserver,
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl MigrationObserver for ProgressObserver {
    fn on_event(&self, event: &MigrationEvent) {
        // Keep log lines from tearing the bar.
        self.bar.suspend(|| self.inner.on_event(event));

        match event {
            MigrationEvent::FolderStarted { name, version, .. } => {
                self.bar.set_message(format!("{} ({})", name, version));
            }
            MigrationEvent::VersionSkipped { .. }
            | MigrationEvent::FolderEmpty { .. }
            | MigrationEvent::CommitCreated { .. } => self.bar.inc(1),
            MigrationEvent::Cancelled { .. } => self.bar.abandon_with_message("cancelled"),
            MigrationEvent::Finished { .. } => self.bar.finish_and_clear(),
            _ => {}
        }
    }
}
