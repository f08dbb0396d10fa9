//! Diagnostic logging. Always written to stderr so the report on stdout stays
//! clean enough to pipe.

use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

/// Base level for a `-v` count: 0 = warn, 1 = info, 2+ = debug.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Build the effective filter, honoring RUST_LOG if set.
pub fn env_filter(verbose: u8) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::new(level_for(verbose))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbose: u8) {
    let _ = fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter(verbose))
        .finish()
        .try_init();
}
