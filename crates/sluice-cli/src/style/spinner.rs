//! Spinner helpers using indicatif.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const SPINNER: &[&str] = &["◇ ", "◆ ", "◇ ", "◆ "];

/// Creates a spinner with a message. Hidden when colors are off, since
/// that also covers non-terminal output.
pub fn create_spinner(msg: &str) -> ProgressBar {
    if super::no_color() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(SPINNER)
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Finishes a spinner and clears it from the terminal.
pub fn finish_and_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}
