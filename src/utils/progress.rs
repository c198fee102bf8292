//! Spinner helpers using indicatif

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner for a stage of unknown length.
///
/// Hidden when stderr is not a terminal, so piped runs and tests stay quiet.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = if console::Term::stderr().is_term() {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    let style = ProgressStyle::default_spinner()
        .template("    {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a spinner with a success message
pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✅ {}", message));
}

/// Finish a spinner with a warning message
pub fn finish_with_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("⚠️  {}", message));
}
