//! Diagnostic logging on stderr.
//!
//! Stdout belongs to the timer displays and listings, so log lines go to
//! stderr only. `BOOKTIMER_LOG` takes standard `EnvFilter` directives and
//! overrides the level picked from `--verbose`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "BOOKTIMER_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "booktimer=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(filter)
        .try_init();

    tracing::debug!(verbose, "logging initialized");
}
