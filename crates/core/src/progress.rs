//! Opt-in terminal progress reporting.
//!
//! Disabled reporters are hidden bars, so call sites never branch on the
//! setting.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner for setup phases of unknown length.
#[must_use]
pub fn spinner(enabled: bool, message: &'static str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let sp = ProgressBar::new_spinner();
    sp.set_style(
        ProgressStyle::with_template("  {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    sp.enable_steady_tick(Duration::from_millis(100));
    sp.set_message(message);
    sp
}

/// Iteration bar for training loops.
#[must_use]
pub fn iterations(enabled: bool, total: u64) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "  training [{bar:40}] {pos}/{len} iters [{elapsed} < {eta}, {per_sec}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}
