pub mod prescription;
pub mod program;

pub use prescription::{
  ExerciseDraft, ExerciseId, ExerciseRef, Load, LoadUnit, PrescribedExercise, PrescribedSet,
  SetScheme, SlotId,
};
pub use program::{
  find_slot, EditingMode, PeriodizationKind, ProgressionRuleSet, WeekMap, WeekStatus, BASE_WEEK,
};
