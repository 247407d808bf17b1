//! Progress indicators for long imports

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Spinner counting processed rows on stderr.
///
/// Stays hidden when stderr is not a terminal or `quiet` is set.
pub fn row_spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} {pos} rows [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
