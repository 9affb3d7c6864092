//! Program State Coordinator
//!
//! Owns the rule set, the week map and the lock state, and decides on every
//! event which weeks to regenerate, which to leave alone and which to lock.
//!
//! Key principles:
//! - Week 1 is authored, every other week is derived unless locked
//! - Rule changes rebuild the whole plan and say so via `Notice::PlanRebuilt`
//! - Program-length changes only touch the weeks being added or dropped
//! - Every transition is a total function of (state, event)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::EngineConfig;
use crate::edit_lock::{diff_fields, same_prescription, EditLockTracker, FieldKind};
use crate::error::ValidationError;
use crate::models::{
    find_slot, EditingMode, ExerciseDraft, ExerciseId, PrescribedExercise, ProgressionRuleSet,
    SlotId, WeekMap, WeekStatus, BASE_WEEK,
};
use crate::progression::{derive, derive_exercise, extend_weeks, generate_weeks};
use crate::snapshot::ProgramSnapshot;

/// Volume given to weeks appended by `set_program_length` when a schedule exists
const DEFAULT_WEEK_VOLUME_PERCENT: f64 = 100.0;

// ---------------------------------------------------------------------------
/// Clock: timestamps for edit history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

// ---------------------------------------------------------------------------
/// Transition Results
// ---------------------------------------------------------------------------

/// Informational signals for the caller. None of these are errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// Rule set changed and every week was rebuilt from week 1.
    /// Manual overrides in `discarded_weeks` are gone.
    PlanRebuilt { discarded_weeks: Vec<u32> },
    /// Program shortened; these weeks and their edit history were dropped
    WeeksDropped {
        weeks: Vec<u32>,
        discarded_locks: Vec<u32>,
    },
    /// Event targeted a week outside the program and was ignored
    WeekOutOfRange { week: u32, length: u32 },
    /// Event targeted an exercise that doesn't exist and was ignored
    ExerciseNotFound { id: ExerciseId },
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transition {
    /// Id of the exercise created by an add
    pub created: Option<ExerciseId>,
    /// Weeks whose content was recomputed by the calculator
    pub regenerated: Vec<u32>,
    /// Weeks that became locked during this event
    pub locked: Vec<u32>,
    pub notices: Vec<Notice>,
}

impl Transition {
    fn notice(notice: Notice) -> Self {
        Self {
            notices: vec![notice],
            ..Self::default()
        }
    }

    /// True when this event threw away manual overrides
    pub fn discarded_overrides(&self) -> bool {
        self.notices.iter().any(|n| match n {
            Notice::PlanRebuilt { discarded_weeks } => !discarded_weeks.is_empty(),
            Notice::WeeksDropped { discarded_locks, .. } => !discarded_locks.is_empty(),
            _ => false,
        })
    }
}

// ---------------------------------------------------------------------------
/// Events: the replayable form of every mutation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgramEvent {
    SetRules {
        rules: ProgressionRuleSet,
    },
    SetProgramLength {
        weeks: u32,
    },
    AddExercise {
        week: u32,
        draft: ExerciseDraft,
        at: DateTime<Utc>,
    },
    EditExercise {
        id: ExerciseId,
        draft: ExerciseDraft,
        at: DateTime<Utc>,
    },
    DeleteExercise {
        id: ExerciseId,
        at: DateTime<Utc>,
    },
    LoadProgram {
        snapshot: ProgramSnapshot,
        at: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
/// Coordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProgramStateCoordinator {
    config: EngineConfig,
    rules: ProgressionRuleSet,
    weeks: WeekMap,
    locks: EditLockTracker,
    mode: EditingMode,
    next_slot: u64,
    clock: Clock,
}

impl ProgramStateCoordinator {
    /// Empty program: every week exists but has no exercises yet
    pub fn new(rules: ProgressionRuleSet, config: EngineConfig) -> Self {
        Self::with_base_week(rules, Vec::new(), config)
    }

    pub fn with_base_week(
        rules: ProgressionRuleSet,
        drafts: Vec<ExerciseDraft>,
        config: EngineConfig,
    ) -> Self {
        let base: Vec<PrescribedExercise> = drafts
            .into_iter()
            .zip(1u64..)
            .map(|(draft, slot)| draft.into_exercise(ExerciseId::for_week(SlotId(slot), BASE_WEEK)))
            .collect();
        let next_slot = base.len() as u64 + 1;
        let weeks = generate_weeks(&base, &rules, &config);

        Self {
            config,
            rules,
            weeks,
            locks: EditLockTracker::new(),
            mode: EditingMode::InitialSetup,
            next_slot,
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn rules(&self) -> &ProgressionRuleSet {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> EditingMode {
        self.mode
    }

    pub fn program_length(&self) -> u32 {
        self.rules.effective().program_length_weeks
    }

    pub fn weeks(&self) -> &WeekMap {
        &self.weeks
    }

    pub fn week(&self, week: u32) -> Option<&[PrescribedExercise]> {
        self.weeks.get(&week).map(Vec::as_slice)
    }

    pub fn base_week(&self) -> &[PrescribedExercise] {
        self.week(BASE_WEEK).unwrap_or_default()
    }

    pub fn exercise(&self, id: ExerciseId) -> Option<&PrescribedExercise> {
        find_slot(self.week(id.week)?, id.slot)
    }

    pub fn locks(&self) -> &EditLockTracker {
        &self.locks
    }

    pub fn is_locked(&self, week: u32) -> bool {
        self.locks.is_locked(week)
    }

    pub fn week_status(&self, week: u32) -> Option<WeekStatus> {
        if !self.weeks.contains_key(&week) {
            return None;
        }
        Some(if self.locks.is_locked(week) {
            WeekStatus::Locked
        } else {
            WeekStatus::Generated
        })
    }

    pub fn edited_fields(&self, week: u32, slot: SlotId) -> BTreeSet<FieldKind> {
        self.locks.edited_fields(week, slot)
    }

    pub fn base_week_is_empty(&self) -> bool {
        self.base_week().is_empty()
    }

    /// Save preconditions: a program name and at least one week-1 exercise
    pub fn validate_for_save(&self, program_name: &str) -> Result<(), ValidationError> {
        if program_name.trim().is_empty() {
            return Err(ValidationError::MissingProgramName);
        }
        if self.base_week_is_empty() {
            return Err(ValidationError::EmptyBaseWeek);
        }
        Ok(())
    }

    pub fn can_save(&self, program_name: &str) -> bool {
        self.validate_for_save(program_name).is_ok()
    }

    pub fn snapshot(&self) -> ProgramSnapshot {
        ProgramSnapshot {
            rules: self.rules.clone(),
            weeks: self.weeks.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn apply(&mut self, event: ProgramEvent) -> Transition {
        match event {
            ProgramEvent::SetRules { rules } => self.set_rules(rules),
            ProgramEvent::SetProgramLength { weeks } => self.set_program_length(weeks),
            ProgramEvent::AddExercise { week, draft, at } => self.add_exercise_at(week, draft, at),
            ProgramEvent::EditExercise { id, draft, at } => self.edit_exercise_at(id, draft, at),
            ProgramEvent::DeleteExercise { id, at } => self.delete_exercise_at(id, at),
            ProgramEvent::LoadProgram { snapshot, at } => self.load_program_at(snapshot, at),
        }
    }

    pub fn replay(&mut self, events: impl IntoIterator<Item = ProgramEvent>) -> Vec<Transition> {
        events.into_iter().map(|event| self.apply(event)).collect()
    }

    pub fn add_exercise(&mut self, week: u32, draft: ExerciseDraft) -> Transition {
        let at = self.clock.now();
        self.add_exercise_at(week, draft, at)
    }

    pub fn edit_exercise(&mut self, id: ExerciseId, draft: ExerciseDraft) -> Transition {
        let at = self.clock.now();
        self.edit_exercise_at(id, draft, at)
    }

    pub fn delete_exercise(&mut self, id: ExerciseId) -> Transition {
        let at = self.clock.now();
        self.delete_exercise_at(id, at)
    }

    /// Take over a persisted program.
    ///
    /// Lock flags are not persisted, so any week that differs from a fresh
    /// regeneration from week 1 comes back locked. That includes generated
    /// weeks grown from a locked last week, and generated weeks left stale by
    /// a week-1 edit during per-week editing.
    pub fn load_program(&mut self, snapshot: ProgramSnapshot) -> Transition {
        let at = self.clock.now();
        self.load_program_at(snapshot, at)
    }

    /// Replace the rule set. Progression changes rebuild every week from
    /// week 1; a pure length change only grows or shrinks the tail.
    pub fn set_rules(&mut self, rules: ProgressionRuleSet) -> Transition {
        let previous = self.rules.effective();
        let next = rules.effective();
        self.rules = rules;

        if previous.progression_differs(&next) {
            self.rebuild()
        } else if previous.program_length_weeks != next.program_length_weeks {
            self.resize(previous.program_length_weeks, next.program_length_weeks)
        } else {
            Transition::default()
        }
    }

    /// Change only the program length. A volume schedule in use is cut or
    /// padded to match so the change isn't mistaken for a rule change. One
    /// that was already being ignored is dropped, so it can't come back into
    /// effect just because the new length happens to fit it.
    pub fn set_program_length(&mut self, weeks: u32) -> Transition {
        let weeks = weeks.max(1);
        let schedule_in_use = self.rules.effective().weekly_volume_percentages.is_some();
        let mut rules = self.rules.clone();

        if schedule_in_use {
            if let Some(schedule) = rules.weekly_volume_percentages.as_mut() {
                schedule.resize(weeks as usize, DEFAULT_WEEK_VOLUME_PERCENT);
            }
        } else if rules.weekly_volume_percentages.take().is_some() {
            tracing::debug!("Dropping volume schedule that doesn't match the program length");
        }
        rules.program_length_weeks = weeks;
        self.set_rules(rules)
    }

    fn add_exercise_at(&mut self, week: u32, draft: ExerciseDraft, at: DateTime<Utc>) -> Transition {
        if let Some(out_of_range) = self.check_week(week) {
            return out_of_range;
        }

        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        let exercise = draft.into_exercise(ExerciseId::for_week(slot, week));
        let mut transition = Transition {
            created: Some(exercise.id),
            ..Transition::default()
        };

        let propagate = week == BASE_WEEK && self.mode == EditingMode::InitialSetup;
        self.weeks.entry(week).or_default().push(exercise.clone());

        if propagate {
            transition.regenerated = self.propagate_slot(&exercise);
        } else {
            let newly_locked = self.lock_week(week, |locks| locks.record_add(week, slot, at));
            transition.locked.extend(newly_locked);
        }

        tracing::debug!(
            week,
            slot = %slot,
            propagated = transition.regenerated.len(),
            "Exercise added"
        );
        transition
    }

    fn edit_exercise_at(&mut self, id: ExerciseId, draft: ExerciseDraft, at: DateTime<Utc>) -> Transition {
        let Some(index) = self.position_of(id) else {
            return self.not_found(id);
        };

        let edited = draft.into_exercise(id);
        let Some(current) = self.weeks.get_mut(&id.week).and_then(|w| w.get_mut(index)) else {
            return self.not_found(id);
        };
        let fields = diff_fields(current, &edited);
        *current = edited.clone();

        let mut transition = Transition::default();
        if id.week == BASE_WEEK {
            if self.mode == EditingMode::InitialSetup {
                transition.regenerated = self.propagate_slot(&edited);
            }
        } else {
            let newly_locked = self.lock_week(id.week, |locks| {
                locks.record_edit(id.week, id.slot, fields.iter().copied(), at)
            });
            transition.locked.extend(newly_locked);
        }

        tracing::debug!(
            exercise = %id,
            fields = ?fields,
            propagated = transition.regenerated.len(),
            "Exercise edited"
        );
        transition
    }

    fn delete_exercise_at(&mut self, id: ExerciseId, at: DateTime<Utc>) -> Transition {
        let Some(index) = self.position_of(id) else {
            return self.not_found(id);
        };
        if let Some(week) = self.weeks.get_mut(&id.week) {
            week.remove(index);
        }

        let mut transition = Transition::default();
        if id.week == BASE_WEEK {
            if self.mode == EditingMode::InitialSetup {
                transition.regenerated = self.remove_slot_from_generated(id.slot);
            }
        } else {
            let newly_locked =
                self.lock_week(id.week, |locks| locks.record_delete(id.week, id.slot, at));
            transition.locked.extend(newly_locked);
        }

        tracing::debug!(exercise = %id, "Exercise deleted");
        transition
    }

    /// Locks are reconstructed by comparing each week with a fresh
    /// regeneration from week 1.
    fn load_program_at(&mut self, snapshot: ProgramSnapshot, at: DateTime<Utc>) -> Transition {
        let ProgramSnapshot { rules, weeks } = snapshot;
        let length = rules.effective().program_length_weeks;

        let mut loaded = WeekMap::new();
        for (week, exercises) in weeks.into_iter().filter(|(w, _)| (BASE_WEEK..=length).contains(w)) {
            loaded.insert(week, exercises.iter().map(|e| e.for_week(week)).collect());
        }
        loaded.entry(BASE_WEEK).or_default();

        // Fill holes from the week before, same as a freshly grown program
        let mut regenerated = Vec::new();
        for week in (BASE_WEEK + 1)..=length {
            if !loaded.contains_key(&week) {
                let source = loaded.get(&(week - 1)).cloned().unwrap_or_default();
                loaded.insert(week, derive(&source, &rules, week, &self.config));
                regenerated.push(week);
            }
        }

        let reference = generate_weeks(&loaded[&BASE_WEEK], &rules, &self.config);
        let mut locks = EditLockTracker::new();
        for (week, actual) in loaded.iter().filter(|(w, _)| **w > BASE_WEEK) {
            let expected = reference.get(week).map(Vec::as_slice).unwrap_or_default();
            reconcile_week(&mut locks, *week, actual, expected, at);
        }

        self.next_slot = loaded
            .values()
            .flatten()
            .map(|e| e.slot().0)
            .max()
            .unwrap_or(0)
            + 1;
        self.mode = if locks.has_locks() {
            EditingMode::PerWeekEditing
        } else {
            EditingMode::InitialSetup
        };
        self.rules = rules;
        self.weeks = loaded;
        self.locks = locks;

        tracing::info!(
            weeks = length,
            locked = ?self.locks.locked_weeks(),
            "Program loaded"
        );

        Transition {
            regenerated,
            locked: self.locks.locked_weeks(),
            ..Transition::default()
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn check_week(&self, week: u32) -> Option<Transition> {
        let length = self.program_length();
        if (BASE_WEEK..=length).contains(&week) {
            None
        } else {
            tracing::warn!(week, length, "Ignoring event for week outside program");
            Some(Transition::notice(Notice::WeekOutOfRange { week, length }))
        }
    }

    fn position_of(&self, id: ExerciseId) -> Option<usize> {
        self.weeks.get(&id.week)?.iter().position(|e| e.slot() == id.slot)
    }

    fn not_found(&self, id: ExerciseId) -> Transition {
        tracing::warn!(exercise = %id, "Ignoring event for unknown exercise");
        Transition::notice(Notice::ExerciseNotFound { id })
    }

    /// Run a tracker mutation on a non-base week and switch to per-week
    /// editing. Returns the week if it wasn't locked before.
    fn lock_week(
        &mut self,
        week: u32,
        record: impl FnOnce(&mut EditLockTracker) -> bool,
    ) -> Option<u32> {
        let was_locked = self.locks.is_locked(week);
        if !record(&mut self.locks) {
            return None;
        }
        if self.mode == EditingMode::InitialSetup {
            tracing::info!(week, "First manual override, switching to per-week editing");
            self.mode = EditingMode::PerWeekEditing;
        }
        (!was_locked).then_some(week)
    }

    /// Carry a base-week exercise through the program, writing its derived
    /// copy into every generated week. Locked weeks are skipped.
    fn propagate_slot(&mut self, base: &PrescribedExercise) -> Vec<u32> {
        let mut touched = Vec::new();

        for week in (BASE_WEEK + 1)..=self.program_length() {
            if self.locks.is_locked(week) {
                continue;
            }
            let candidate = derive_exercise(base, BASE_WEEK, &self.rules, week, &self.config);
            let exercises = self.weeks.entry(week).or_default();
            match exercises.iter_mut().find(|e| e.slot() == candidate.slot()) {
                Some(existing) => *existing = candidate,
                None => exercises.push(candidate),
            }
            touched.push(week);
        }
        touched
    }

    fn remove_slot_from_generated(&mut self, slot: SlotId) -> Vec<u32> {
        let mut touched = Vec::new();
        for (week, exercises) in self.weeks.iter_mut() {
            if *week == BASE_WEEK || self.locks.is_locked(*week) {
                continue;
            }
            let before = exercises.len();
            exercises.retain(|e| e.slot() != slot);
            if exercises.len() != before {
                touched.push(*week);
            }
        }
        touched
    }

    fn rebuild(&mut self) -> Transition {
        let discarded_weeks = self.locks.clear_all();
        let base = self.base_week().to_vec();
        self.weeks = generate_weeks(&base, &self.rules, &self.config);
        self.mode = EditingMode::InitialSetup;

        if discarded_weeks.is_empty() {
            tracing::info!("Progression rules changed, plan rebuilt from week 1");
        } else {
            tracing::warn!(
                discarded = ?discarded_weeks,
                "Progression rules changed, manual overrides discarded"
            );
        }

        Transition {
            regenerated: self.weeks.keys().copied().filter(|w| *w > BASE_WEEK).collect(),
            notices: vec![Notice::PlanRebuilt { discarded_weeks }],
            ..Transition::default()
        }
    }

    fn resize(&mut self, from: u32, to: u32) -> Transition {
        if to > from {
            let added = extend_weeks(&mut self.weeks, &self.rules, to, &self.config);
            tracing::info!(from, to, added = ?added, "Program lengthened");
            return Transition {
                regenerated: added,
                ..Transition::default()
            };
        }

        let dropped: Vec<u32> = self.weeks.split_off(&(to + 1)).into_keys().collect();
        let discarded_locks = self.locks.retain_through(to);
        tracing::info!(from, to, discarded_locks = ?discarded_locks, "Program shortened");

        Transition::notice(Notice::WeeksDropped {
            weeks: dropped,
            discarded_locks,
        })
    }
}

/// Record implicit locks for a loaded week that diverges from regeneration
fn reconcile_week(
    locks: &mut EditLockTracker,
    week: u32,
    actual: &[PrescribedExercise],
    expected: &[PrescribedExercise],
    at: DateTime<Utc>,
) {
    for exercise in actual {
        match find_slot(expected, exercise.slot()) {
            None => {
                locks.record_add(week, exercise.slot(), at);
            }
            Some(generated) if !same_prescription(generated, exercise) => {
                locks.record_edit(week, exercise.slot(), diff_fields(generated, exercise), at);
            }
            Some(_) => {}
        }
    }
    for generated in expected {
        if find_slot(actual, generated.slot()).is_none() {
            locks.record_delete(week, generated.slot(), at);
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
