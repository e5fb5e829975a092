//! Diagnostic tracing for tether.
//!
//! Tracing goes to stderr so it never mixes with the JSON or page text on
//! stdout, and it is filtered by `RUST_LOG` (default `warn`). Degraded
//! version lookups show up at `warn`; startup facts and phase transitions at
//! `debug`. The create/sync transcript is a separate artifact: the reporter
//! writes it to `log.transcript_file` on every operation whatever the filter.

use std::io::{self, IsTerminal};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber. Called once, before any command runs.
///
/// ```bash
/// RUST_LOG=tether=debug tether --yes run
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // The interactive shell redraws stderr; keep escape codes out of
    // redirected output.
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .compact();

    tracing_subscriber::registry().with(filter).with(layer).init();
}
