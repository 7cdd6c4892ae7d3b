//! Computes the exact, audit-reproducible quality metrics for one extracted
//! candidate (§4.8).
//!
//! Deliberately independent of the solver's internal objective value: the
//! objective in `objective.rs` is a linear-relaxation-friendly proxy used
//! only to steer search, while this module recomputes gap counts and
//! preference violations directly from the final assignment set.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Assignment, InputModel, Metrics, TeacherId};

pub fn evaluate(input: &InputModel, assignments: &[Assignment]) -> Metrics {
    let total_assignments = assignments.len() as u32;

    let teachers_used: BTreeSet<&TeacherId> = assignments.iter().map(|a| &a.teacher_id).collect();
    let rooms_used: BTreeSet<_> = assignments.iter().map(|a| &a.room_id).collect();

    let mut teacher_workload: BTreeMap<TeacherId, u32> = BTreeMap::new();
    for a in assignments {
        *teacher_workload.entry(a.teacher_id.clone()).or_insert(0) += 1;
    }
    let teacher_workload_stdev = stdev(teacher_workload.values().copied());

    let gaps_count = count_gaps(assignments);
    let preference_violations = count_preference_violations(input, assignments);

    let total_score = 10 * total_assignments as i64
        - 5 * gaps_count as i64
        - 2 * preference_violations as i64;

    Metrics {
        total_assignments,
        teachers_used: teachers_used.len() as u32,
        rooms_used: rooms_used.len() as u32,
        teacher_workload,
        teacher_workload_stdev,
        gaps_count,
        preference_violations,
        total_score,
    }
}

fn stdev(values: impl Iterator<Item = u32>) -> f64 {
    let values: Vec<f64> = values.map(|v| v as f64).collect();
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sum, over every (teacher, day) with at least one assignment, of the
/// number of unoccupied periods strictly between that teacher's first and
/// last occupied period of the day. Adjacent occupied periods contribute 0.
fn count_gaps(assignments: &[Assignment]) -> u32 {
    let mut by_teacher_day: BTreeMap<(TeacherId, u8), BTreeSet<u8>> = BTreeMap::new();
    for a in assignments {
        by_teacher_day
            .entry((a.teacher_id.clone(), a.day_of_week))
            .or_default()
            .insert(a.period);
    }

    let mut gaps = 0u32;
    for periods in by_teacher_day.values() {
        let Some(&first) = periods.iter().next() else {
            continue;
        };
        let Some(&last) = periods.iter().next_back() else {
            continue;
        };
        let span = (last - first + 1) as u32;
        gaps += span - periods.len() as u32;
    }
    gaps
}

/// For each teacher with a non-empty `preferred_periods`, counts every
/// assignment whose period falls outside that set.
fn count_preference_violations(input: &InputModel, assignments: &[Assignment]) -> u32 {
    let mut violations = 0u32;

    for a in assignments {
        let Some(teacher) = input.teachers.get(&a.teacher_id) else {
            continue;
        };
        let prefs = &teacher.preferences;
        if !prefs.preferred_periods.is_empty() && !prefs.preferred_periods.contains(&a.period) {
            violations += 1;
        }
    }
    violations
}
