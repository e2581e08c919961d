use std::cmp::min;
use std::fmt::Write;
use std::time::{Duration, Instant};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use proxy_bench_core::prelude::DelegatedShutdownListener;

const TEMPLATE: &str = "{spinner:.green} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {planned_runtime}]";

/// Displays a progress bar while the load phase is running to show the user how long is left.
pub(crate) fn start_progress(
    planned_runtime: Duration,
    mut shutdown_listener: DelegatedShutdownListener,
) -> anyhow::Result<()> {
    let style = match ProgressStyle::with_template(TEMPLATE) {
        Ok(style) => style
            .with_key("planned_runtime", {
                let total = planned_runtime.as_secs();
                let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
                move |_state: &ProgressState, w: &mut dyn Write| {
                    let _ = write!(w, "{hours:02}:{minutes:02}:{seconds:02}");
                }
            })
            .progress_chars("#>-"),
        Err(e) => {
            log::warn!("Invalid progress template, using the default: {e}");
            ProgressStyle::default_bar()
        }
    };

    std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let start_time = Instant::now();
            let pb = ProgressBar::new(planned_runtime.as_secs());
            pb.set_style(style);

            loop {
                if shutdown_listener.should_shutdown() {
                    log::trace!("Progress thread shutting down");
                    pb.finish_and_clear();
                    break;
                }

                let new = min(start_time.elapsed().as_secs(), planned_runtime.as_secs());
                pb.set_position(new);
                std::thread::sleep(Duration::from_millis(250));
            }
        })
        .context("Failed to start progress thread")?;

    Ok(())
}
