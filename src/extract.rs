//! Converts raw solver tuples into the public [`Assignment`] shape (§4.7).
//!
//! Trivial by design: all legality and partition reasoning already happened
//! in `variables`/`constraints`. This stage only translates the tuple shape
//! and fixes a deterministic, human-readable ordering.

use crate::model::Assignment;
use crate::solver::RawSolution;

pub fn extract(raw: &RawSolution) -> Vec<Assignment> {
    let mut assignments: Vec<Assignment> = raw
        .assignments
        .iter()
        .map(|(class_id, subject_id, teacher_id, room_id, day, period)| Assignment {
            class_id: class_id.clone(),
            subject_id: subject_id.clone(),
            teacher_id: teacher_id.clone(),
            room_id: room_id.clone(),
            day_of_week: *day,
            period: *period,
        })
        .collect();

    assignments.sort();
    assignments
}
