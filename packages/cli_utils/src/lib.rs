#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for the nba-stats binaries.
//!
//! Logging and the day counter share one terminal: [`init_logger`] routes
//! log records through the [`MultiProgress`] that owns the bars, and
//! [`IndicatifProgress`] draws the scoreboard fetch as days done out of
//! days requested.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use nba_stats_scoreboard::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Day counter for a scoreboard range fetch.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied when the fetch reports how many days it will request.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Spins while the range is being resolved, then counts days.
    #[must_use]
    pub fn days_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} days [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs a timestamped `pretty_env_logger` (filtered by `RUST_LOG`) as
/// the global logger and returns the [`MultiProgress`] it prints through.
/// Add every bar to that handle or log lines will overwrite it.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_timed_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // A second call keeps the first logger.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
