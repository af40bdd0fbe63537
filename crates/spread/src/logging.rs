//! Logging bootstrap.
//!
//! Every Spread crate logs through `tracing`. Libraries never install a
//! subscriber; applications that want to see those logs can call
//! [`init`] once at startup.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set, so calling it
/// more than once (or from tests) is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
