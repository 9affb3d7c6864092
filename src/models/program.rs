use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::models::prescription::{PrescribedExercise, SlotId};

/// Week 1 is authored by the user; every other week is derived from it
pub const BASE_WEEK: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodizationKind {
  /// Flat program, every week copies the previous one
  #[default]
  None,
  /// Compounding per-week increments on load and volume
  Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRuleSet {
  pub kind: PeriodizationKind,
  #[serde(default)]
  pub volume_increment_percent: f64,
  #[serde(default)]
  pub load_increment_percent: f64,
  pub program_length_weeks: u32,
  /// Percent of base volume for each week, e.g. [100, 80, 90, 60]
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weekly_volume_percentages: Option<Vec<f64>>,
}

impl Default for ProgressionRuleSet {
  fn default() -> Self {
    Self {
      kind: PeriodizationKind::None,
      volume_increment_percent: 0.0,
      load_increment_percent: 0.0,
      program_length_weeks: 1,
      weekly_volume_percentages: None,
    }
  }
}

impl ProgressionRuleSet {
  pub fn linear(load_increment_percent: f64, volume_increment_percent: f64, weeks: u32) -> Self {
    Self {
      kind: PeriodizationKind::Linear,
      volume_increment_percent,
      load_increment_percent,
      program_length_weeks: weeks,
      weekly_volume_percentages: None,
    }
  }

  pub fn flat(weeks: u32) -> Self {
    Self {
      program_length_weeks: weeks,
      ..Self::default()
    }
  }

  pub fn with_volume_schedule(mut self, schedule: Vec<f64>) -> Self {
    self.weekly_volume_percentages = Some(schedule);
    self
  }

  /// Boundary check run by settings editors before handing rules over
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.program_length_weeks < 1 {
      return Err(ValidationError::InvalidProgramLength(self.program_length_weeks));
    }
    if !self.load_increment_percent.is_finite() {
      return Err(ValidationError::NonFiniteValue("load_increment_percent"));
    }
    if !self.volume_increment_percent.is_finite() {
      return Err(ValidationError::NonFiniteValue("volume_increment_percent"));
    }
    if let Some(schedule) = &self.weekly_volume_percentages {
      if schedule.len() != self.program_length_weeks as usize {
        return Err(ValidationError::VolumeScheduleMismatch {
          expected: self.program_length_weeks,
          found: schedule.len(),
        });
      }
      if schedule.iter().any(|p| !p.is_finite()) {
        return Err(ValidationError::NonFiniteValue("weekly_volume_percentages"));
      }
    }
    Ok(())
  }

  /// Rules with invalid values replaced by their identity defaults.
  /// Regeneration always runs on these so it stays computable.
  pub fn effective(&self) -> Self {
    let program_length_weeks = self.program_length_weeks.max(1);
    let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
    let weekly_volume_percentages = self.weekly_volume_percentages.as_ref().filter(|s| {
      s.len() == program_length_weeks as usize && s.iter().all(|p| p.is_finite())
    });

    Self {
      kind: self.kind,
      volume_increment_percent: finite_or_zero(self.volume_increment_percent),
      load_increment_percent: finite_or_zero(self.load_increment_percent),
      program_length_weeks,
      weekly_volume_percentages: weekly_volume_percentages.cloned(),
    }
  }

  /// True when the two rule sets progress weeks differently, ignoring
  /// program length. Schedules are compared over the weeks both cover.
  pub fn progression_differs(&self, other: &Self) -> bool {
    if self.kind != other.kind
      || self.load_increment_percent != other.load_increment_percent
      || self.volume_increment_percent != other.volume_increment_percent
    {
      return true;
    }
    match (&self.weekly_volume_percentages, &other.weekly_volume_percentages) {
      (None, None) => false,
      (Some(a), Some(b)) => a.iter().zip(b.iter()).any(|(x, y)| x != y),
      _ => true,
    }
  }
}

/// Exercises for each week, keyed by week number
pub type WeekMap = BTreeMap<u32, Vec<PrescribedExercise>>;

/// Find an exercise in a week by its slot
pub fn find_slot(week: &[PrescribedExercise], slot: SlotId) -> Option<&PrescribedExercise> {
  week.iter().find(|e| e.slot() == slot)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStatus {
  Generated,
  Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EditingMode {
  /// Building week 1; additions propagate to generated weeks
  #[default]
  InitialSetup,
  /// At least one non-base week has been overridden
  PerWeekEditing,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validate_rejects_schedule_mismatch() {
    let rules = ProgressionRuleSet::flat(4).with_volume_schedule(vec![100.0, 80.0]);
    match rules.validate() {
      Err(ValidationError::VolumeScheduleMismatch { expected, found }) => {
        assert_eq!(expected, 4);
        assert_eq!(found, 2);
      }
      other => panic!("Unexpected result: {:?}", other),
    }
  }

  #[test]
  fn test_validate_rejects_zero_length() {
    assert!(matches!(
      ProgressionRuleSet::flat(0).validate(),
      Err(ValidationError::InvalidProgramLength(0))
    ));
  }

  #[test]
  fn test_effective_degrades_to_identity_defaults() {
    let rules = ProgressionRuleSet {
      kind: PeriodizationKind::Linear,
      volume_increment_percent: f64::NAN,
      load_increment_percent: 5.0,
      program_length_weeks: 0,
      weekly_volume_percentages: Some(vec![100.0, 90.0]),
    };
    let effective = rules.effective();
    assert_eq!(effective.program_length_weeks, 1);
    assert_eq!(effective.volume_increment_percent, 0.0);
    assert_eq!(effective.load_increment_percent, 5.0);
    assert!(effective.weekly_volume_percentages.is_none());
  }

  #[test]
  fn test_progression_differs_ignores_length_and_schedule_tail() {
    let short = ProgressionRuleSet::linear(5.0, 0.0, 2).with_volume_schedule(vec![100.0, 80.0]);
    let long =
      ProgressionRuleSet::linear(5.0, 0.0, 3).with_volume_schedule(vec![100.0, 80.0, 90.0]);
    assert!(!short.progression_differs(&long));

    let changed =
      ProgressionRuleSet::linear(5.0, 0.0, 3).with_volume_schedule(vec![100.0, 70.0, 90.0]);
    assert!(short.progression_differs(&changed));
    assert!(short.progression_differs(&ProgressionRuleSet::linear(10.0, 0.0, 2)));
  }
}
