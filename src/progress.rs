//! Progress bar for harvesting runs.

use harvester_core::ProgressObserver;
use indicatif::{ProgressBar, ProgressStyle};

/// Resolution of the bar; fractions are scaled to this many steps.
const STEPS: u64 = 1000;

/// Terminal progress bar fed by the pipeline's progress reports.
pub(crate) struct ProgressUi {
    bar: ProgressBar,
}

impl ProgressUi {
    /// Creates the bar, hidden when `visible` is false (quiet runs, piped stderr).
    pub(crate) fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(STEPS);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {wide_bar} {percent:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for ProgressUi {
    fn on_progress(&self, fraction: f64, status: &str) {
        self.bar.set_position(to_steps(fraction));
        self.bar.set_message(status.to_string());
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn to_steps(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * STEPS as f64).round() as u64
}
