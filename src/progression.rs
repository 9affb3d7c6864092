//! Week-over-week Progression Calculator
//!
//! Derives a week's prescriptions from an earlier week:
//! - load compounds by `load_increment_percent` per week (Linear only),
//!   rounded to the configured precision at every week
//! - reps compound by `volume_increment_percent` per week (Linear only)
//! - reps are additionally scaled by the weekly volume schedule, so week w
//!   lands on its authored percentage of base instead of compounding on a deload
//!
//! Key principles:
//! - Pure and total: same inputs, same outputs, never panics
//! - Set count is never changed here, only by explicit user edits
//! - A field whose factor is exactly 1 is copied untouched
//! - Reps are rounded once, when written out. The rep multiplier across any
//!   number of weeks is kept unrounded, so small increments still add up and
//!   a week after a deload returns to its scheduled volume

use crate::config::EngineConfig;
use crate::models::{
    PeriodizationKind, PrescribedExercise, PrescribedSet, ProgressionRuleSet, SetScheme, WeekMap,
    BASE_WEEK,
};

// ---------------------------------------------------------------------------
/// Step Factors: multipliers from a source week to a later week
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepFactors {
    /// Per-week load multiplier, applied once for every week crossed
    pub load: f64,
    /// Rep multiplier for the whole span
    pub volume: f64,
    /// Weeks between source and target
    pub weeks: u32,
}

impl StepFactors {
    pub const IDENTITY: StepFactors = StepFactors {
        load: 1.0,
        volume: 1.0,
        weeks: 0,
    };

    /// Factors for stepping into `target_week` from the week before it
    pub fn for_week(rules: &ProgressionRuleSet, target_week: u32) -> Self {
        Self::between(rules, target_week.saturating_sub(1), target_week)
    }

    /// Factors for carrying `source_week` forward to `target_week`. Rules are
    /// sanitised first.
    pub fn between(rules: &ProgressionRuleSet, source_week: u32, target_week: u32) -> Self {
        if source_week < BASE_WEEK || target_week <= source_week {
            return Self::IDENTITY;
        }
        let rules = rules.effective();
        let weeks = target_week - source_week;

        let (load, growth) = match rules.kind {
            PeriodizationKind::None => (1.0, 1.0),
            PeriodizationKind::Linear => (
                1.0 + rules.load_increment_percent / 100.0,
                1.0 + rules.volume_increment_percent / 100.0,
            ),
        };
        let growth = growth.powi(i32::try_from(weeks).unwrap_or(i32::MAX));

        Self {
            load,
            volume: growth
                * schedule_ratio(
                    rules.weekly_volume_percentages.as_deref(),
                    source_week,
                    target_week,
                ),
            weeks,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.weeks == 0 || (self.load == 1.0 && self.volume == 1.0)
    }
}

/// Ratio of the target week's scheduled volume to the source week's. A 0%
/// source week has nothing to scale from, so the most recent non-zero week
/// before it stands in. Weeks outside the schedule are treated as unchanged.
fn schedule_ratio(schedule: Option<&[f64]>, source_week: u32, target_week: u32) -> f64 {
    let Some(schedule) = schedule else {
        return 1.0;
    };
    let Some(current) = schedule.get(target_week as usize - 1) else {
        return 1.0;
    };
    let reference = schedule
        .iter()
        .take(source_week as usize)
        .rev()
        .find(|p| **p > 0.0);

    match reference {
        Some(reference) => current / reference,
        None => 1.0,
    }
}

// ---------------------------------------------------------------------------
/// Derivation
// ---------------------------------------------------------------------------

/// Derive `target_week` from the exercises of the week immediately before it
pub fn derive(
    source: &[PrescribedExercise],
    rules: &ProgressionRuleSet,
    target_week: u32,
    config: &EngineConfig,
) -> Vec<PrescribedExercise> {
    derive_from(source, target_week.saturating_sub(1), rules, target_week, config)
}

/// Derive `target_week` from the exercises of any earlier `source_week`
pub fn derive_from(
    source: &[PrescribedExercise],
    source_week: u32,
    rules: &ProgressionRuleSet,
    target_week: u32,
    config: &EngineConfig,
) -> Vec<PrescribedExercise> {
    let factors = StepFactors::between(rules, source_week, target_week);
    source
        .iter()
        .map(|exercise| apply_factors(exercise, factors, target_week, config))
        .collect()
}

/// Derive a single exercise from `source_week` into `target_week`
pub fn derive_exercise(
    exercise: &PrescribedExercise,
    source_week: u32,
    rules: &ProgressionRuleSet,
    target_week: u32,
    config: &EngineConfig,
) -> PrescribedExercise {
    apply_factors(
        exercise,
        StepFactors::between(rules, source_week, target_week),
        target_week,
        config,
    )
}

fn apply_factors(
    exercise: &PrescribedExercise,
    factors: StepFactors,
    target_week: u32,
    config: &EngineConfig,
) -> PrescribedExercise {
    let mut derived = exercise.for_week(target_week);
    if factors.is_identity() {
        return derived;
    }

    derived.scheme = match &exercise.scheme {
        SetScheme::Uniform { set_count, set } => SetScheme::Uniform {
            set_count: *set_count,
            set: scale_set(set, factors, config),
        },
        SetScheme::Varied { sets } => SetScheme::Varied {
            sets: sets.iter().map(|s| scale_set(s, factors, config)).collect(),
        },
    };
    derived
}

fn scale_set(set: &PrescribedSet, factors: StepFactors, config: &EngineConfig) -> PrescribedSet {
    let mut scaled = set.clone();

    if factors.volume != 1.0 {
        let reps = (set.reps as f64 * factors.volume).round();
        // `as` saturates, so huge or negative products stay in range
        scaled.reps = reps.max(config.min_reps as f64) as u32;
    }

    if factors.load != 1.0 {
        let mut load = set.load.value;
        for _ in 0..factors.weeks {
            load = config.round_load(load * factors.load).max(config.min_load);
        }
        scaled.load.value = load;
    }

    scaled
}

/// Carry the base week forward to `target_week`
pub fn project(
    base: &[PrescribedExercise],
    rules: &ProgressionRuleSet,
    target_week: u32,
    config: &EngineConfig,
) -> Vec<PrescribedExercise> {
    derive_from(base, BASE_WEEK, rules, target_week.max(BASE_WEEK), config)
}

/// Build every week of the program from the base week
pub fn generate_weeks(
    base: &[PrescribedExercise],
    rules: &ProgressionRuleSet,
    config: &EngineConfig,
) -> WeekMap {
    let length = rules.effective().program_length_weeks;

    let mut weeks: WeekMap = (BASE_WEEK..=length)
        .map(|week| (week, project(base, rules, week, config)))
        .collect();

    tracing::debug!(
        weeks = length,
        exercises = base.len(),
        "Generated program from base week"
    );
    weeks
}

/// Append derived weeks after the last existing week until `new_length`,
/// each carried forward from that last week. Existing weeks are left alone.
/// Returns the weeks that were added.
pub fn extend_weeks(
    weeks: &mut WeekMap,
    rules: &ProgressionRuleSet,
    new_length: u32,
    config: &EngineConfig,
) -> Vec<u32> {
    let Some((&last, source)) = weeks.last_key_value() else {
        return Vec::new();
    };
    let source = source.clone();

    let added: Vec<u32> = ((last + 1)..=new_length).collect();
    for &week in &added {
        weeks.insert(week, derive_from(&source, last, rules, week, config));
    }
    added
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
