//! Periodized training program builder
//!
//! Derives every week of a multi-week program from a user-authored base week
//! and a progression rule set, while tracking which weeks the user has
//! overridden by hand so regeneration never silently clobbers them.

pub mod config;
pub mod coordinator;
pub mod edit_lock;
pub mod error;
pub mod logging;
pub mod models;
pub mod progression;
pub mod snapshot;

#[cfg(test)]
mod test_utils;

pub use config::EngineConfig;
pub use coordinator::{Clock, Notice, ProgramEvent, ProgramStateCoordinator, Transition};
pub use edit_lock::{EditLockTracker, FieldKind};
pub use error::{SnapshotError, ValidationError};
pub use snapshot::{ProgramRow, ProgramSnapshot};

/// Load configuration from the environment and start logging.
/// Meant to be called once by the host application at startup.
pub fn bootstrap() -> EngineConfig {
  let config = EngineConfig::from_env();
  if logging::init("info") {
    tracing::info!(?config, "Program builder ready");
  }
  config
}
