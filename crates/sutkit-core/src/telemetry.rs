//! Tracing setup for the `sutkit` binary.
//!
//! [`init_tracing`] installs the global subscriber: an `EnvFilter` plus either
//! the human-readable or the JSON formatter. The CLI maps `--json` and
//! `--verbose` straight onto its two arguments.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json` - when `true`, emit newline-delimited JSON log lines
///   (one object per lifecycle event, ready for a log shipper).
/// * `level` - default verbosity when `RUST_LOG` is not set.
///
/// `RUST_LOG` wins over `level`, so `RUST_LOG=sutkit_core::lifecycle=debug`
/// narrows output to the lifecycle manager. Everything is written to stderr;
/// `sutkit plan --format json` keeps stdout for the plan itself.
///
/// Only the first call in a process installs a subscriber.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .json(),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}
