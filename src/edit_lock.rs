//! Edit-Lock Tracker
//!
//! Records which weeks the user has overridden by hand, and per exercise slot
//! which fields (load, reps, set count) were touched and when. A locked week is
//! skipped by automatic regeneration until the rule set itself changes.
//!
//! The base week is never locked: it is the source every other week derives
//! from, not a derived target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Load, PrescribedExercise, PrescribedSet, SlotId, BASE_WEEK};

/// Loads closer than this are the same load. Absorbs float noise picked up
/// on the way through persistence.
const LOAD_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
/// Field Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Load,
    Reps,
    SetCount,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Reps => write!(f, "reps"),
            Self::SetCount => write!(f, "set_count"),
        }
    }
}

/// Exercise added to or removed from a week by hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralEdit {
    Added,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEditRecord {
    pub fields: BTreeSet<FieldKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural: Option<StructuralEdit>,
    pub last_edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekLock {
    pub locked_at: DateTime<Utc>,
    pub exercises: BTreeMap<SlotId, ExerciseEditRecord>,
}

// ---------------------------------------------------------------------------
/// Tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditLockTracker {
    weeks: BTreeMap<u32, WeekLock>,
}

impl EditLockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `week` and union `fields` into the slot's edit history.
    /// Returns false (and records nothing) for the base week.
    pub fn record_edit(
        &mut self,
        week: u32,
        slot: SlotId,
        fields: impl IntoIterator<Item = FieldKind>,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(record) = self.touch(week, slot, at) else {
            return false;
        };
        record.fields.extend(fields);
        true
    }

    pub fn record_add(&mut self, week: u32, slot: SlotId, at: DateTime<Utc>) -> bool {
        self.record_structural(week, slot, StructuralEdit::Added, at)
    }

    pub fn record_delete(&mut self, week: u32, slot: SlotId, at: DateTime<Utc>) -> bool {
        self.record_structural(week, slot, StructuralEdit::Deleted, at)
    }

    fn record_structural(
        &mut self,
        week: u32,
        slot: SlotId,
        edit: StructuralEdit,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(record) = self.touch(week, slot, at) else {
            return false;
        };
        record.structural = Some(edit);
        true
    }

    fn touch(&mut self, week: u32, slot: SlotId, at: DateTime<Utc>) -> Option<&mut ExerciseEditRecord> {
        if week <= BASE_WEEK {
            return None;
        }

        let lock = self.weeks.entry(week).or_insert_with(|| {
            tracing::debug!(week, "Week locked by manual edit");
            WeekLock {
                locked_at: at,
                exercises: BTreeMap::new(),
            }
        });
        let record = lock.exercises.entry(slot).or_insert_with(|| ExerciseEditRecord {
            fields: BTreeSet::new(),
            structural: None,
            last_edited_at: at,
        });
        record.last_edited_at = at;
        Some(record)
    }

    pub fn is_locked(&self, week: u32) -> bool {
        self.weeks.contains_key(&week)
    }

    pub fn locked_weeks(&self) -> Vec<u32> {
        self.weeks.keys().copied().collect()
    }

    pub fn has_locks(&self) -> bool {
        !self.weeks.is_empty()
    }

    pub fn week_lock(&self, week: u32) -> Option<&WeekLock> {
        self.weeks.get(&week)
    }

    pub fn record(&self, week: u32, slot: SlotId) -> Option<&ExerciseEditRecord> {
        self.weeks.get(&week)?.exercises.get(&slot)
    }

    /// Fields of `slot` hand-edited in `week`
    pub fn edited_fields(&self, week: u32, slot: SlotId) -> BTreeSet<FieldKind> {
        self.record(week, slot)
            .map(|r| r.fields.clone())
            .unwrap_or_default()
    }

    /// Unlock every week and drop all history. Returns the weeks that were locked.
    pub fn clear_all(&mut self) -> Vec<u32> {
        let cleared = self.locked_weeks();
        self.weeks.clear();
        cleared
    }

    /// Forget weeks past `last_week`. Returns the locked weeks that were dropped.
    pub fn retain_through(&mut self, last_week: u32) -> Vec<u32> {
        let dropped = self.weeks.split_off(&last_week.saturating_add(1));
        dropped.into_keys().collect()
    }
}

// ---------------------------------------------------------------------------
/// Diffing
// ---------------------------------------------------------------------------

fn same_load(a: &Load, b: &Load) -> bool {
    a.unit == b.unit && (a.value - b.value).abs() <= LOAD_TOLERANCE
}

/// Which of load/reps/set count differ between two versions of an exercise.
/// Sets are compared position by position; differing set counts always
/// report `SetCount`.
pub fn diff_fields(original: &PrescribedExercise, edited: &PrescribedExercise) -> BTreeSet<FieldKind> {
    let before = original.scheme.sets();
    let after = edited.scheme.sets();

    let mut fields = BTreeSet::new();
    if before.len() != after.len() {
        fields.insert(FieldKind::SetCount);
    }
    for (a, b) in before.iter().zip(&after) {
        if !same_load(&a.load, &b.load) {
            fields.insert(FieldKind::Load);
        }
        if a.reps != b.reps {
            fields.insert(FieldKind::Reps);
        }
    }
    fields
}

fn same_set_details(a: &PrescribedSet, b: &PrescribedSet) -> bool {
    a.rest_seconds == b.rest_seconds
        && a.tempo == b.tempo
        && a.rpe == b.rpe
        && a.rir == b.rir
        && a.notes == b.notes
}

/// Same prescription in every respect except the week-scoped id
pub fn same_prescription(a: &PrescribedExercise, b: &PrescribedExercise) -> bool {
    a.exercise_ref == b.exercise_ref
        && a.pairing_label == b.pairing_label
        && a.notes == b.notes
        && diff_fields(a, b).is_empty()
        && a.scheme
            .sets()
            .iter()
            .zip(&b.scheme.sets())
            .all(|(x, y)| same_set_details(x, y))
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
