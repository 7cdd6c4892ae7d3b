//! Enumerates legal (class, subject, teacher, room, day, period) tuples and
//! allocates one boolean decision variable per tuple (§4.3).
//!
//! The legality filter — qualification, capacity, features, availability —
//! runs here, before any `good_lp` variable is allocated, following the
//! teacher's `is_assignment_possible` pre-filter idiom.

use std::collections::{BTreeMap, HashMap};

use good_lp::{variable, ProblemVariables, Variable};
use log::{debug, info};

use crate::availability::ResolvedAvailability;
use crate::error::EngineError;
use crate::model::{ClassId, Day, InputModel, Period, RoomId, SubjectId, TeacherId};

pub type Tuple = (ClassId, SubjectId, TeacherId, RoomId, Day, Period);

/// All legal decision variables plus the projection indexes the constraint
/// and objective encoders need.
pub struct VariableIndex {
    pub vars: HashMap<Tuple, Variable>,
    pub by_teacher_slot: HashMap<(TeacherId, Day, Period), Vec<Tuple>>,
    pub by_room_slot: HashMap<(RoomId, Day, Period), Vec<Tuple>>,
    pub by_class_slot: HashMap<(ClassId, Day, Period), Vec<Tuple>>,
    pub by_class_subject: HashMap<(ClassId, SubjectId), Vec<Tuple>>,
    pub by_class_subject_day_slot: HashMap<(ClassId, SubjectId, Day, Period), Vec<Tuple>>,
}

pub fn build(
    model: &InputModel,
    availability: &ResolvedAvailability,
    problem: &mut ProblemVariables,
) -> Result<VariableIndex, EngineError> {
    let days = model.instance.days as Day;

    let mut vars = HashMap::new();
    let mut by_teacher_slot: HashMap<(TeacherId, Day, Period), Vec<Tuple>> = HashMap::new();
    let mut by_room_slot: HashMap<(RoomId, Day, Period), Vec<Tuple>> = HashMap::new();
    let mut by_class_slot: HashMap<(ClassId, Day, Period), Vec<Tuple>> = HashMap::new();
    let mut by_class_subject: HashMap<(ClassId, SubjectId), Vec<Tuple>> = HashMap::new();
    let mut by_class_subject_day_slot: HashMap<(ClassId, SubjectId, Day, Period), Vec<Tuple>> =
        HashMap::new();

    for ((class_id, subject_id), &periods_per_week) in &model.requirements {
        if periods_per_week == 0 {
            continue;
        }
        let class = model.classes[class_id];
        let subject = model.subjects[subject_id];

        let qualified_teachers: Vec<&TeacherId> = model
            .qualifications
            .iter()
            .filter(|(_, s)| s == subject_id)
            .map(|(t, _)| t)
            .collect();

        let suitable_rooms: Vec<&RoomId> = model
            .rooms
            .values()
            .filter(|r| {
                r.capacity >= class.student_count && subject.required_features.is_subset(&r.features)
            })
            .map(|r| &r.id)
            .collect();

        for &teacher_id in &qualified_teachers {
            for &room_id in &suitable_rooms {
                for day in 0..days {
                    let available_periods = availability.periods_for(teacher_id, day);
                    for &period in &available_periods {
                        let tuple: Tuple = (
                            class_id.clone(),
                            subject_id.clone(),
                            teacher_id.clone(),
                            room_id.clone(),
                            day,
                            period,
                        );
                        let var = problem.add(variable().binary());
                        by_teacher_slot
                            .entry((teacher_id.clone(), day, period))
                            .or_default()
                            .push(tuple.clone());
                        by_room_slot
                            .entry((room_id.clone(), day, period))
                            .or_default()
                            .push(tuple.clone());
                        by_class_slot
                            .entry((class_id.clone(), day, period))
                            .or_default()
                            .push(tuple.clone());
                        by_class_subject
                            .entry((class_id.clone(), subject_id.clone()))
                            .or_default()
                            .push(tuple.clone());
                        by_class_subject_day_slot
                            .entry((class_id.clone(), subject_id.clone(), day, period))
                            .or_default()
                            .push(tuple.clone());
                        vars.insert(tuple, var);
                    }
                }
            }
        }

        if !by_class_subject.contains_key(&(class_id.clone(), subject_id.clone())) {
            return Err(EngineError::Internal(format!(
                "no legal slot for {class_id}/{subject_id}"
            )));
        }
    }

    info!(
        "variable builder: {} legal decision variables generated",
        vars.len()
    );
    debug!(
        "projection maps: {} teacher-slots, {} room-slots, {} class-slots",
        by_teacher_slot.len(),
        by_room_slot.len(),
        by_class_slot.len()
    );

    Ok(VariableIndex {
        vars,
        by_teacher_slot,
        by_room_slot,
        by_class_slot,
        by_class_subject,
        by_class_subject_day_slot,
    })
}

/// Convenience grouping used by `constraints`/`objective` to avoid
/// re-deriving "all (teacher, day) pairs with at least one legal variable".
pub fn teacher_days(index: &VariableIndex) -> BTreeMap<TeacherId, Vec<Day>> {
    let mut out: BTreeMap<TeacherId, Vec<Day>> = BTreeMap::new();
    for (teacher, day, _period) in index.by_teacher_slot.keys() {
        let days = out.entry(teacher.clone()).or_default();
        if !days.contains(day) {
            days.push(*day);
        }
    }
    out
}
