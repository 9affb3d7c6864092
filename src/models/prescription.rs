use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical exercise slot. Assigned once when an exercise is created and
/// shared by every week's copy of that exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u64);

impl fmt::Display for SlotId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Week-scoped exercise id, derived from the slot and the week number so
/// regenerating a week always yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExerciseId {
  pub slot: SlotId,
  pub week: u32,
}

impl ExerciseId {
  pub fn for_week(slot: SlotId, week: u32) -> Self {
    Self { slot, week }
  }
}

impl fmt::Display for ExerciseId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-w{}", self.slot, self.week)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadUnit {
  Kg,
  Lb,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Load {
  pub value: f64,
  pub unit: LoadUnit,
}

impl Load {
  pub fn kg(value: f64) -> Self {
    Self { value, unit: LoadUnit::Kg }
  }

  pub fn lb(value: f64) -> Self {
    Self { value, unit: LoadUnit::Lb }
  }
}

/// One prescribed set. Replaced wholesale on edit, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescribedSet {
  pub set_number: u32,
  pub reps: u32,
  pub load: Load,
  pub rest_seconds: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tempo: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rpe: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rir: Option<u8>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl PrescribedSet {
  pub fn new(set_number: u32, reps: u32, load: Load) -> Self {
    Self {
      set_number,
      reps,
      load,
      rest_seconds: 90,
      tempo: None,
      rpe: None,
      rir: None,
      notes: None,
    }
  }
}

/// Shape of an exercise's sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetScheme {
  /// Every set shares reps, load and tempo
  Uniform { set_count: u32, set: PrescribedSet },
  /// Sets individually specified
  Varied { sets: Vec<PrescribedSet> },
}

impl SetScheme {
  pub fn set_count(&self) -> usize {
    match self {
      SetScheme::Uniform { set_count, .. } => *set_count as usize,
      SetScheme::Varied { sets } => sets.len(),
    }
  }

  /// Expand into one `PrescribedSet` per position, numbered from 1
  pub fn sets(&self) -> Vec<PrescribedSet> {
    match self {
      SetScheme::Uniform { set_count, set } => (1..=*set_count)
        .map(|n| PrescribedSet {
          set_number: n,
          ..set.clone()
        })
        .collect(),
      SetScheme::Varied { sets } => sets.clone(),
    }
  }
}

/// Library exercise or one the user typed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ExerciseRef {
  Library { id: String },
  Custom { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescribedExercise {
  pub id: ExerciseId,
  pub exercise_ref: ExerciseRef,
  /// Superset grouping such as "A1"
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pairing_label: Option<String>,
  pub scheme: SetScheme,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl PrescribedExercise {
  pub fn slot(&self) -> SlotId {
    self.id.slot
  }

  /// Copy of this exercise re-keyed for another week
  pub fn for_week(&self, week: u32) -> Self {
    Self {
      id: ExerciseId::for_week(self.id.slot, week),
      ..self.clone()
    }
  }
}

/// Exercise content without identity, as supplied by the editing flows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDraft {
  pub exercise_ref: ExerciseRef,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pairing_label: Option<String>,
  pub scheme: SetScheme,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl ExerciseDraft {
  pub fn into_exercise(self, id: ExerciseId) -> PrescribedExercise {
    PrescribedExercise {
      id,
      exercise_ref: self.exercise_ref,
      pairing_label: self.pairing_label,
      scheme: self.scheme,
      notes: self.notes,
    }
  }
}

impl From<&PrescribedExercise> for ExerciseDraft {
  fn from(exercise: &PrescribedExercise) -> Self {
    Self {
      exercise_ref: exercise.exercise_ref.clone(),
      pairing_label: exercise.pairing_label.clone(),
      scheme: exercise.scheme.clone(),
      notes: exercise.notes.clone(),
    }
  }
}
