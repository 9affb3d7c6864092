//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Exercise and draft factories
//! - A fixed timestamp for edit history
//! - Helper accessors for the first set of an exercise

use crate::models::{
  ExerciseDraft, ExerciseId, ExerciseRef, Load, PrescribedExercise, PrescribedSet, SetScheme,
  SlotId, BASE_WEEK,
};
use chrono::{DateTime, TimeZone, Utc};

/// ---------------------------------------------------------------------------
/// Time
/// ---------------------------------------------------------------------------

/// Monday morning, so edit timestamps are stable across runs
pub fn fixed_time() -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(2026, 3, 2, 7, 30, 0)
    .single()
    .expect("valid fixed time")
}

/// ---------------------------------------------------------------------------
/// Exercise Factories
/// ---------------------------------------------------------------------------

fn library(id: &str) -> ExerciseRef {
  ExerciseRef::Library { id: id.to_string() }
}

/// Week-1 exercise with `set_count` identical sets
pub fn make_uniform_exercise(slot: u64, set_count: u32, reps: u32, load: f64) -> PrescribedExercise {
  PrescribedExercise {
    id: ExerciseId::for_week(SlotId(slot), BASE_WEEK),
    exercise_ref: library("back_squat"),
    pairing_label: None,
    scheme: SetScheme::Uniform {
      set_count,
      set: PrescribedSet::new(1, reps, Load::kg(load)),
    },
    notes: None,
  }
}

pub fn single_set_exercise(slot: u64, reps: u32, load: f64) -> PrescribedExercise {
  make_uniform_exercise(slot, 1, reps, load)
}

/// Week-1 pyramid: 12 @ 60, 10 @ 70, 8 @ 80
pub fn make_varied_exercise(slot: u64) -> PrescribedExercise {
  let sets = [(12, 60.0), (10, 70.0), (8, 80.0)]
    .into_iter()
    .zip(1u32..)
    .map(|((reps, load), n)| PrescribedSet {
      tempo: Some("3-1-1-0".to_string()),
      ..PrescribedSet::new(n, reps, Load::kg(load))
    })
    .collect();

  PrescribedExercise {
    id: ExerciseId::for_week(SlotId(slot), BASE_WEEK),
    exercise_ref: library("bench_press"),
    pairing_label: Some("A1".to_string()),
    scheme: SetScheme::Varied { sets },
    notes: None,
  }
}

/// Uniform draft for a library exercise
pub fn draft(exercise: &str, set_count: u32, reps: u32, load: f64) -> ExerciseDraft {
  ExerciseDraft {
    exercise_ref: library(exercise),
    pairing_label: None,
    scheme: SetScheme::Uniform {
      set_count,
      set: PrescribedSet::new(1, reps, Load::kg(load)),
    },
    notes: None,
  }
}

/// ---------------------------------------------------------------------------
/// Accessors
/// ---------------------------------------------------------------------------

pub fn top_load(exercise: &PrescribedExercise) -> f64 {
  exercise.scheme.sets()[0].load.value
}

pub fn reps_of(exercise: &PrescribedExercise) -> u32 {
  exercise.scheme.sets()[0].reps
}
