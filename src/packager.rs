//! Defensively re-validates and ranks the raw candidates produced by
//! `solver`/`extract`/`metrics` before they leave the engine (§4.9).
//!
//! Re-checking invariants here, rather than trusting the solver, is the same
//! belt-and-braces posture the teacher's `calculate_score_and_unmet_constraints`
//! takes toward its own solver output.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::availability::ResolvedAvailability;
use crate::model::{Assignment, Candidate, ClassScope, InputModel, Metrics};

/// Re-validates one candidate's assignments against the invariants a legal
/// timetable must satisfy, returning `false` (and logging why) if any of
/// them is violated. A violation here indicates a modeling bug upstream —
/// this function exists to catch that class of bug before it reaches a
/// caller, not to repair it.
fn is_structurally_valid(
    input: &InputModel,
    availability: &ResolvedAvailability,
    assignments: &[Assignment],
) -> bool {
    let mut teacher_slots = BTreeSet::new();
    let mut room_slots = BTreeSet::new();
    let mut class_slots = BTreeSet::new();

    for a in assignments {
        if !teacher_slots.insert((a.teacher_id.clone(), a.day_of_week, a.period)) {
            warn!("packager: teacher double-booked at {:?}/{}", a.teacher_id, a.period);
            return false;
        }
        if !room_slots.insert((a.room_id.clone(), a.day_of_week, a.period)) {
            warn!("packager: room double-booked at {:?}/{}", a.room_id, a.period);
            return false;
        }
        if !class_slots.insert((a.class_id.clone(), a.day_of_week, a.period)) {
            warn!("packager: class double-booked at {:?}/{}", a.class_id, a.period);
            return false;
        }
        if !input.qualifications.contains(&(a.teacher_id.clone(), a.subject_id.clone())) {
            warn!("packager: unqualified teacher {:?} assigned subject {:?}", a.teacher_id, a.subject_id);
            return false;
        }

        let Some(class) = input.classes.get(&a.class_id) else {
            warn!("packager: assignment references unknown class {:?}", a.class_id);
            return false;
        };
        let Some(subject) = input.subjects.get(&a.subject_id) else {
            warn!("packager: assignment references unknown subject {:?}", a.subject_id);
            return false;
        };
        let Some(room) = input.rooms.get(&a.room_id) else {
            warn!("packager: assignment references unknown room {:?}", a.room_id);
            return false;
        };
        if room.capacity < class.student_count || !subject.required_features.is_subset(&room.features) {
            warn!(
                "packager: room {:?} unsuitable for class {:?} subject {:?}",
                a.room_id, a.class_id, a.subject_id
            );
            return false;
        }

        if !availability.periods_for(&a.teacher_id, a.day_of_week).contains(&a.period) {
            warn!(
                "packager: teacher {:?} assigned outside availability at day {} period {}",
                a.teacher_id, a.day_of_week, a.period
            );
            return false;
        }
    }

    for ((class_id, subject_id), &required) in &input.requirements {
        let actual = assignments
            .iter()
            .filter(|a| &a.class_id == class_id && &a.subject_id == subject_id)
            .count() as u32;
        if actual != required {
            warn!(
                "packager: class {class_id} subject {subject_id} got {actual} periods, required {required}"
            );
            return false;
        }
    }

    if !consecutive_blocks_partition_correctly(input, assignments) {
        return false;
    }

    true
}

/// Invariant 8: for every consecutive requirement (class, subject, B), the
/// periods occupied by that (class, subject) on each day must be a disjoint
/// union of runs of consecutive periods whose lengths are each a multiple
/// of B — never a "loose" run that doesn't divide evenly into B-blocks.
fn consecutive_blocks_partition_correctly(input: &InputModel, assignments: &[Assignment]) -> bool {
    for req in &input.consecutive {
        let ClassScope::Class(class_id) = &req.scope else {
            continue;
        };
        let block_size = req.block_size;

        let mut by_day: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
        for a in assignments {
            if &a.class_id == class_id && a.subject_id == req.subject_id {
                by_day.entry(a.day_of_week).or_default().push(a.period);
            }
        }

        for (day, mut periods) in by_day {
            periods.sort_unstable();
            let mut run_len = 1u32;
            for pair in periods.windows(2) {
                if pair[1] == pair[0] + 1 {
                    run_len += 1;
                } else {
                    if run_len % block_size != 0 {
                        warn!(
                            "packager: class {class_id} subject {} day {day} has a run of {run_len} periods not divisible by block size {block_size}",
                            req.subject_id
                        );
                        return false;
                    }
                    run_len = 1;
                }
            }
            if !periods.is_empty() && run_len % block_size != 0 {
                warn!(
                    "packager: class {class_id} subject {} day {day} has a run of {run_len} periods not divisible by block size {block_size}",
                    req.subject_id
                );
                return false;
            }
        }
    }
    true
}

/// A deterministic fingerprint for deduplication: assignments sorted the
/// same way `extract::extract` produces them, so two solver runs that land
/// on the identical timetable compare equal regardless of solve order.
fn fingerprint(assignments: &[Assignment]) -> Vec<Assignment> {
    let mut sorted = assignments.to_vec();
    sorted.sort();
    sorted
}

/// Builds the final, ranked candidate list (§4.9, §3 invariant 11).
///
/// Invalid candidates (a modeling bug surfacing as a broken invariant) and
/// exact duplicates are dropped silently; `solver`'s no-good cuts already
/// make duplicates unlikely, so this is a defensive backstop.
pub fn package(
    input: &InputModel,
    raw: Vec<(Vec<Assignment>, Metrics)>,
) -> Vec<Candidate> {
    let availability = crate::availability::resolve(input);
    let mut seen = BTreeSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for (assignments, metrics) in raw {
        if !is_structurally_valid(input, &availability, &assignments) {
            continue;
        }
        let key = fingerprint(&assignments);
        if !seen.insert(key) {
            continue;
        }
        candidates.push(Candidate {
            total_score: metrics.total_score,
            assignments,
            metrics,
        });
    }

    candidates.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then(
                a.metrics
                    .teacher_workload_stdev
                    .partial_cmp(&b.metrics.teacher_workload_stdev)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then_with(|| a.assignments.cmp(&b.assignments))
    });

    candidates
}
