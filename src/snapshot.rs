//! Program snapshots at the engine boundary
//!
//! A full program in, a full program out. Persistence layers flatten a
//! snapshot into one row per exercise per week and rebuild it from rows.

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::models::{
  ExerciseId, ExerciseRef, PrescribedExercise, ProgressionRuleSet, SetScheme, SlotId, WeekMap,
  BASE_WEEK,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSnapshot {
  pub rules: ProgressionRuleSet,
  pub weeks: WeekMap,
}

/// One exercise in one week, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRow {
  pub week: u32,
  pub position: u32,
  pub slot: SlotId,
  pub library_exercise_id: Option<String>,
  pub custom_exercise_name: Option<String>,
  pub pairing_label: Option<String>,
  pub scheme_json: String,
  pub notes: Option<String>,
}

impl SetScheme {
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  pub fn to_json(&self) -> String {
    serde_json::to_string(self).unwrap_or_default()
  }
}

impl ProgramSnapshot {
  pub fn to_json(&self) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
    Ok(serde_json::from_str(json)?)
  }

  /// Flatten into rows ordered by week, then position within the week
  pub fn to_rows(&self) -> Vec<ProgramRow> {
    self
      .weeks
      .iter()
      .flat_map(|(week, exercises)| {
        exercises
          .iter()
          .zip(0u32..)
          .map(move |(exercise, position)| exercise_row(*week, position, exercise))
      })
      .collect()
  }

  /// Rebuild from stored rows. Weeks without rows come back empty.
  pub fn from_rows(rules: ProgressionRuleSet, rows: &[ProgramRow]) -> Result<Self, SnapshotError> {
    let length = rules.effective().program_length_weeks;

    let mut ordered: Vec<&ProgramRow> = rows.iter().collect();
    ordered.sort_by_key(|r| (r.week, r.position));

    let mut weeks: WeekMap = (BASE_WEEK..=length).map(|w| (w, Vec::new())).collect();
    for row in ordered {
      let exercises = weeks
        .get_mut(&row.week)
        .ok_or(SnapshotError::WeekOutOfRange {
          week: row.week,
          length,
        })?;
      exercises.push(row_exercise(row)?);
    }

    Ok(Self { rules, weeks })
  }
}

fn exercise_row(week: u32, position: u32, exercise: &PrescribedExercise) -> ProgramRow {
  let (library_exercise_id, custom_exercise_name) = match &exercise.exercise_ref {
    ExerciseRef::Library { id } => (Some(id.clone()), None),
    ExerciseRef::Custom { name } => (None, Some(name.clone())),
  };

  ProgramRow {
    week,
    position,
    slot: exercise.slot(),
    library_exercise_id,
    custom_exercise_name,
    pairing_label: exercise.pairing_label.clone(),
    scheme_json: exercise.scheme.to_json(),
    notes: exercise.notes.clone(),
  }
}

fn row_exercise(row: &ProgramRow) -> Result<PrescribedExercise, SnapshotError> {
  let id = ExerciseId::for_week(row.slot, row.week);

  let exercise_ref = match (&row.library_exercise_id, &row.custom_exercise_name) {
    (Some(id), _) => ExerciseRef::Library { id: id.clone() },
    (None, Some(name)) => ExerciseRef::Custom { name: name.clone() },
    (None, None) => {
      return Err(SnapshotError::MissingExerciseRef {
        exercise: id.to_string(),
      })
    }
  };

  let scheme = SetScheme::from_json(&row.scheme_json).map_err(|e| SnapshotError::SchemeParse {
    exercise: id.to_string(),
    reason: e.to_string(),
  })?;

  Ok(PrescribedExercise {
    id,
    exercise_ref,
    pairing_label: row.pairing_label.clone(),
    scheme,
    notes: row.notes.clone(),
  })
}
