//! Logging setup
//!
//! Installs a global `tracing` subscriber. `RUST_LOG` wins when set,
//! otherwise this crate logs at the requested level.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Returns false if one was already set.
pub fn init(default_level: &str) -> bool {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(format!("program_builder={}", default_level)));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .compact()
    .try_init()
    .is_ok()
}
