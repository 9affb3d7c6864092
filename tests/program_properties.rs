//! End-to-end checks of the progression engine through its public API

use program_builder::models::{
    ExerciseDraft, ExerciseId, ExerciseRef, Load, PrescribedExercise, PrescribedSet,
    ProgressionRuleSet, SetScheme, SlotId, WeekStatus, BASE_WEEK,
};
use program_builder::progression::{derive, generate_weeks};
use program_builder::{
    Clock, EngineConfig, FieldKind, Notice, ProgramSnapshot, ProgramStateCoordinator,
};

use chrono::{TimeZone, Utc};

fn clock() -> Clock {
    Clock::Fixed(Utc.with_ymd_and_hms(2026, 1, 5, 18, 0, 0).single().unwrap())
}

fn uniform(exercise: &str, set_count: u32, reps: u32, load: f64) -> ExerciseDraft {
    ExerciseDraft {
        exercise_ref: ExerciseRef::Library {
            id: exercise.to_string(),
        },
        pairing_label: None,
        scheme: SetScheme::Uniform {
            set_count,
            set: PrescribedSet::new(1, reps, Load::kg(load)),
        },
        notes: None,
    }
}

fn program(rules: ProgressionRuleSet) -> ProgramStateCoordinator {
    ProgramStateCoordinator::with_base_week(
        rules,
        vec![uniform("back_squat", 1, 10, 100.0), uniform("pull_up", 3, 8, 0.0)],
        EngineConfig::default(),
    )
    .with_clock(clock())
}

fn squat(week: u32) -> ExerciseId {
    ExerciseId::for_week(SlotId(1), week)
}

fn first_set(program: &ProgramStateCoordinator, id: ExerciseId) -> PrescribedSet {
    program.exercise(id).expect("exercise exists").scheme.sets()[0].clone()
}

fn reload_with_load(exercise: &PrescribedExercise, load: f64) -> ExerciseDraft {
    let mut draft = ExerciseDraft::from(exercise);
    if let SetScheme::Uniform { set, .. } = &mut draft.scheme {
        set.load = Load::kg(load);
    }
    draft
}

#[test]
fn linear_load_compounds_and_reps_hold() {
    let program = program(ProgressionRuleSet::linear(5.0, 0.0, 3));

    assert_eq!(first_set(&program, squat(2)).load.value, 105.0);
    assert_eq!(first_set(&program, squat(3)).load.value, 110.25);
    for week in 1..=3 {
        assert_eq!(first_set(&program, squat(week)).reps, 10);
    }
}

#[test]
fn volume_schedule_deloads_and_recovers() {
    let rules = ProgressionRuleSet::flat(3).with_volume_schedule(vec![100.0, 80.0, 100.0]);
    let program = program(rules);

    assert_eq!(first_set(&program, squat(2)).reps, 8);
    assert_eq!(first_set(&program, squat(3)).reps, 10);
    assert!((1..=3).all(|w| first_set(&program, squat(w)).load.value == 100.0));
}

fn squat_reps(program: &ProgramStateCoordinator) -> Vec<u32> {
    program
        .weeks()
        .keys()
        .map(|w| first_set(program, squat(*w)).reps)
        .collect()
}

#[test]
fn scheduled_weeks_land_on_their_percentage_of_base() {
    let deload = ProgressionRuleSet::flat(3).with_volume_schedule(vec![100.0, 75.0, 100.0]);
    assert_eq!(squat_reps(&program(deload)), vec![10, 8, 10]);

    let rest_week = ProgressionRuleSet::flat(3).with_volume_schedule(vec![100.0, 0.0, 100.0]);
    assert_eq!(squat_reps(&program(rest_week)), vec![10, 0, 10]);
}

#[test]
fn volume_increment_sets_exact_reps() {
    let program_with = |rules: ProgressionRuleSet| {
        ProgramStateCoordinator::with_base_week(
            rules,
            vec![uniform("goblet_squat", 3, 5, 24.0)],
            EngineConfig::default(),
        )
    };

    let slow = program_with(ProgressionRuleSet::linear(0.0, 5.0, 5));
    assert_eq!(squat_reps(&slow), vec![5, 5, 6, 6, 6]);

    let grows = program(ProgressionRuleSet::linear(0.0, 10.0, 2));
    assert_eq!(squat_reps(&grows), vec![10, 11]);

    let rules = ProgressionRuleSet::linear(0.0, 10.0, 2).with_volume_schedule(vec![100.0, 80.0]);
    let deloads = program(rules);
    assert_eq!(squat_reps(&deloads), vec![10, 9]);
    assert_eq!(first_set(&deloads, squat(2)).load.value, 100.0);
}

#[test]
fn rule_change_rebuilds_over_manual_override() {
    let mut program = program(ProgressionRuleSet::linear(5.0, 0.0, 3));
    let week3 = program.exercise(squat(3)).unwrap().clone();
    let _ = program.edit_exercise(squat(3), reload_with_load(&week3, 200.0));
    assert_eq!(program.week_status(3), Some(WeekStatus::Locked));

    let transition = program.set_rules(ProgressionRuleSet::linear(10.0, 0.0, 3));

    assert!(transition.discarded_overrides());
    assert!(matches!(
        transition.notices.as_slice(),
        [Notice::PlanRebuilt { discarded_weeks }] if discarded_weeks == &vec![3]
    ));
    assert_eq!(program.week_status(3), Some(WeekStatus::Generated));
    assert_eq!(first_set(&program, squat(3)).load.value, 121.0);
}

#[test]
fn rule_change_unlocks_everything_and_matches_fresh_generation() {
    let mut program = program(ProgressionRuleSet::linear(5.0, 0.0, 6));
    let _ = program.delete_exercise(squat(2));
    let _ = program.add_exercise(4, uniform("farmer_carry", 2, 1, 32.0));
    let week5 = program.exercise(squat(5)).unwrap().clone();
    let _ = program.edit_exercise(squat(5), reload_with_load(&week5, 90.0));
    assert_eq!(program.locks().locked_weeks(), vec![2, 4, 5]);

    let rules = ProgressionRuleSet::linear(2.5, 5.0, 6)
        .with_volume_schedule(vec![100.0, 90.0, 100.0, 60.0, 100.0, 110.0]);
    let _ = program.set_rules(rules.clone());

    assert!((1..=6).all(|w| !program.is_locked(w)));
    let expected = generate_weeks(program.base_week(), &rules, &EngineConfig::default());
    assert_eq!(program.weeks(), &expected);
}

#[test]
fn locked_week_survives_base_adds_and_length_changes() {
    let mut program = program(ProgressionRuleSet::linear(5.0, 0.0, 4));
    let week3 = program.exercise(squat(3)).unwrap().clone();
    let _ = program.edit_exercise(squat(3), reload_with_load(&week3, 200.0));
    let locked = program.week(3).unwrap().to_vec();

    let _ = program.add_exercise(BASE_WEEK, uniform("hip_thrust", 3, 12, 80.0));
    let _ = program.set_program_length(8);
    let _ = program.set_program_length(3);
    let _ = program.add_exercise(BASE_WEEK, uniform("calf_raise", 4, 15, 40.0));

    assert_eq!(program.week(3).unwrap(), locked.as_slice());
    assert!(program.is_locked(3));
    assert_eq!(
        program.edited_fields(3, SlotId(1)),
        [FieldKind::Load].into_iter().collect::<std::collections::BTreeSet<_>>()
    );
}

#[test]
fn grow_then_shrink_restores_original_weeks() {
    let rules = ProgressionRuleSet::linear(5.0, 5.0, 4)
        .with_volume_schedule(vec![100.0, 90.0, 100.0, 70.0]);
    let mut program = program(rules);
    let original = program.weeks().clone();

    let grown = program.set_program_length(9);
    assert_eq!(grown.regenerated, (5..=9).collect::<Vec<_>>());
    let shrunk = program.set_program_length(4);

    assert!(!shrunk.discarded_overrides());
    assert_eq!(program.weeks(), &original);
}

#[test]
fn none_kind_repeats_base_week() {
    let program = program(ProgressionRuleSet::flat(12));

    for (week, exercises) in program.weeks() {
        assert_eq!(exercises.len(), 2);
        for (exercise, base) in exercises.iter().zip(program.base_week()) {
            assert_eq!(exercise.id, ExerciseId::for_week(base.slot(), *week));
            assert_eq!(exercise.scheme, base.scheme);
        }
    }
}

#[test]
fn derive_is_idempotent_including_ids() {
    let program = program(ProgressionRuleSet::linear(3.0, 2.0, 5));
    let rules = program.rules().clone();
    let config = EngineConfig::default();
    let week2 = program.week(2).unwrap();

    let first = derive(week2, &rules, 3, &config);
    let second = derive(week2, &rules, 3, &config);

    assert_eq!(first, second);
    assert_eq!(first.as_slice(), program.week(3).unwrap());
}

#[test]
fn stored_rows_reload_with_locks() {
    let mut program = program(ProgressionRuleSet::linear(5.0, 0.0, 4));
    let week2 = program.exercise(squat(2)).unwrap().clone();
    let _ = program.edit_exercise(squat(2), reload_with_load(&week2, 150.0));
    let _ = program.delete_exercise(ExerciseId::for_week(SlotId(2), 4));

    let snapshot = program.snapshot();
    let rows = snapshot.to_rows();
    let restored = ProgramSnapshot::from_rows(snapshot.rules.clone(), &rows).unwrap();

    let mut reopened =
        ProgramStateCoordinator::new(ProgressionRuleSet::default(), EngineConfig::default())
            .with_clock(clock());
    let transition = reopened.load_program(restored);

    assert_eq!(transition.locked, vec![2, 4]);
    assert_eq!(reopened.weeks(), program.weeks());
    assert!(reopened.can_save("Winter strength"));
    assert!(!reopened.can_save(""));
}
