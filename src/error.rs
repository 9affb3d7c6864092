//! Error types for the program builder
//!
//! The engine's mutations never fail. These errors belong to the boundary:
//! settings validation before rules are handed over, save preconditions, and
//! decoding persisted program rows.

use serde::Serialize;
use thiserror::Error;

/// ---------------------------------------------------------------------------
/// Validation Errors
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
  #[error("Program name is required")]
  MissingProgramName,

  #[error("Week 1 needs at least one exercise")]
  EmptyBaseWeek,

  #[error("Program length must be at least 1 week (got {0})")]
  InvalidProgramLength(u32),

  #[error("Weekly volume schedule has {found} entries, expected {expected}")]
  VolumeScheduleMismatch { expected: u32, found: usize },

  #[error("{0} must be a finite number")]
  NonFiniteValue(&'static str),
}

impl Serialize for ValidationError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Snapshot Errors
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SnapshotError {
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Failed to parse set scheme for {exercise}: {reason}")]
  SchemeParse { exercise: String, reason: String },

  #[error("Row for {exercise} names no library or custom exercise")]
  MissingExerciseRef { exercise: String },

  #[error("Row for week {week} is outside the {length}-week program")]
  WeekOutOfRange { week: u32, length: u32 },
}

impl Serialize for SnapshotError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_error_serializes_as_message() {
    let json = serde_json::to_string(&ValidationError::EmptyBaseWeek).unwrap();
    assert_eq!(json, "\"Week 1 needs at least one exercise\"");
  }

  #[test]
  fn test_snapshot_error_wraps_json() {
    let err: SnapshotError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(err.to_string().starts_with("JSON error"));
  }
}
