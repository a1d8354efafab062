//! Diagnostics for scriptpilot
//!
//! Everything the user is meant to read goes through the console. Tracing
//! events are for debugging and go to stderr, filtered by `SCRIPTPILOT_LOG`
//! (same syntax as `RUST_LOG`, default `warn`).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "SCRIPTPILOT_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}
