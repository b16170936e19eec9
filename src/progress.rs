use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Create a spinner that tracks how many logical items (lines, segments,
/// walks, …) have been processed. Graph files are streamed, so the total is
/// never known up front.
///
/// The spinner draws to stderr and stays hidden when stderr is not a terminal,
/// so redirected runs only carry log output.
pub fn count_progress_bar(label: impl Into<String>, unit_label: &str) -> ProgressBar {
    let label = label.into();
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    let template = format!(
        "{{prefix:.bold.dim}} {{spinner:.green}} [{{elapsed_precise}}] {{pos}} {unit_label} processed ({{per_sec}} {unit_label}/s) {{msg}}",
    );
    let style = ProgressStyle::with_template(&template).unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(label);
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}

/// Create a spinner-style progress bar for a blocking step such as an
/// external tool invocation.
pub fn spinner_progress(label: impl Into<String>, message: impl Into<String>) -> ProgressBar {
    let label = label.into();
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template("{prefix:.bold.dim} {spinner:.green} {msg} [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(label);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}
