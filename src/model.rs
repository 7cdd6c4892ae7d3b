//! Normalized, validated view of a scheduling problem instance.
//!
//! Raw [`Instance`] values come in from the caller (§6 of the design doc);
//! [`InputModel::build`] validates them and produces the read-only indexes
//! the rest of the pipeline (`availability`, `variables`, `constraints`, ...)
//! consumes for the lifetime of one solve.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(TeacherId);
string_id!(RoomId);
string_id!(SubjectId);
string_id!(ClassId);

pub type Day = u8;
pub type Period = u8;

/// Teacher availability document, as provided by the caller.
///
/// Day keys accept full names (`monday`..`friday`) and three-letter forms
/// (`mon`..`fri`); absent days default to "all periods available".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityDoc {
    #[serde(default)]
    pub days: BTreeMap<String, DayAvailability>,
    #[serde(default)]
    pub never_monday_morning: bool,
    #[serde(default)]
    pub no_last_period: bool,
    #[serde(default)]
    pub no_early_morning: bool,
}

/// Per-day availability entry. If only `available` is given, it is the set
/// of permitted periods. If only `unavailable` is given, it is subtracted
/// from "all periods". If both are given, `available` minus `unavailable`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayAvailability {
    #[serde(default)]
    pub available: Option<BTreeSet<Period>>,
    #[serde(default)]
    pub unavailable: Option<BTreeSet<Period>>,
}

/// Teacher preference document. Soft — affects objective and metrics, never
/// feasibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesDoc {
    #[serde(default)]
    pub preferred_days: BTreeSet<Day>,
    #[serde(default)]
    pub preferred_periods: BTreeSet<Period>,
    #[serde(default)]
    pub avoided_periods: BTreeSet<Period>,
    #[serde(default)]
    pub prefers_morning: bool,
    #[serde(default)]
    pub prefers_afternoon: bool,
    #[serde(default = "default_max_daily_load")]
    pub max_daily_load: u32,
    #[serde(default = "default_max_consecutive_periods")]
    pub max_consecutive_periods: u32,
    #[serde(default)]
    pub preferred_rooms: BTreeSet<RoomId>,
}

fn default_max_daily_load() -> u32 {
    6
}

fn default_max_consecutive_periods() -> u32 {
    4
}

impl Default for PreferencesDoc {
    fn default() -> Self {
        PreferencesDoc {
            preferred_days: BTreeSet::new(),
            preferred_periods: BTreeSet::new(),
            avoided_periods: BTreeSet::new(),
            prefers_morning: false,
            prefers_afternoon: false,
            max_daily_load: default_max_daily_load(),
            max_consecutive_periods: default_max_consecutive_periods(),
            preferred_rooms: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    #[serde(default)]
    pub availability: AvailabilityDoc,
    #[serde(default)]
    pub preferences: PreferencesDoc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub capacity: u32,
    #[serde(default)]
    pub features: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    #[serde(default)]
    pub required_features: BTreeSet<String>,
    #[serde(default)]
    pub default_periods_per_week: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub student_count: u32,
}

/// Scope of a [`ConsecutiveRequirement`] — a specific class, or `"all"`
/// meaning every class with a matching subject requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassScope {
    All,
    Class(ClassId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsecutiveRequirement {
    pub scope: ClassScope,
    pub subject_id: SubjectId,
    pub block_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub periods_per_week: u32,
}

/// Raw problem instance as accepted at the engine boundary (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub teachers: Vec<Teacher>,
    pub rooms: Vec<Room>,
    pub subjects: Vec<Subject>,
    pub classes: Vec<Class>,
    pub qualifications: Vec<(TeacherId, SubjectId)>,
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub consecutive: Vec<ConsecutiveRequirement>,
    #[serde(default = "default_days")]
    pub days: usize,
    #[serde(default = "default_periods_per_day")]
    pub periods_per_day: usize,
}

fn default_days() -> usize {
    5
}

fn default_periods_per_day() -> usize {
    8
}

/// Normalized, validated view of an [`Instance`] (§4.1).
///
/// Built once per solve; borrowed read-only by every downstream stage.
#[derive(Debug)]
pub struct InputModel<'a> {
    pub instance: &'a Instance,
    pub teachers: BTreeMap<TeacherId, &'a Teacher>,
    pub rooms: BTreeMap<RoomId, &'a Room>,
    pub subjects: BTreeMap<SubjectId, &'a Subject>,
    pub classes: BTreeMap<ClassId, &'a Class>,
    pub qualifications: BTreeSet<(TeacherId, SubjectId)>,
    pub requirements: BTreeMap<(ClassId, SubjectId), u32>,
    pub consecutive: Vec<ConsecutiveRequirement>,
    /// Non-fatal warnings collected during validation (e.g. a consecutive
    /// requirement whose block size does not divide periods_per_week).
    pub warnings: Vec<String>,
}

impl<'a> InputModel<'a> {
    pub fn build(instance: &'a Instance) -> Result<Self, EngineError> {
        if instance.days == 0 || instance.periods_per_day == 0 {
            return Err(EngineError::InvalidInput(
                "days and periods_per_day must both be greater than zero".into(),
            ));
        }
        if instance.teachers.is_empty() {
            return Err(EngineError::InvalidInput("no teachers provided".into()));
        }
        if instance.classes.is_empty() {
            return Err(EngineError::InvalidInput("no classes provided".into()));
        }
        if instance.subjects.is_empty() {
            return Err(EngineError::InvalidInput("no subjects provided".into()));
        }
        if instance.rooms.is_empty() {
            return Err(EngineError::InvalidInput("no rooms provided".into()));
        }
        if instance.requirements.is_empty() {
            return Err(EngineError::InvalidInput("no requirements provided".into()));
        }

        let teachers: BTreeMap<TeacherId, &Teacher> = instance
            .teachers
            .iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        let rooms: BTreeMap<RoomId, &Room> =
            instance.rooms.iter().map(|r| (r.id.clone(), r)).collect();
        let subjects: BTreeMap<SubjectId, &Subject> = instance
            .subjects
            .iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        let classes: BTreeMap<ClassId, &Class> = instance
            .classes
            .iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let qualifications: BTreeSet<(TeacherId, SubjectId)> =
            instance.qualifications.iter().cloned().collect();

        let mut requirements: BTreeMap<(ClassId, SubjectId), u32> = BTreeMap::new();
        for req in &instance.requirements {
            if req.periods_per_week as usize > instance.days * instance.periods_per_day {
                return Err(EngineError::InvalidInput(format!(
                    "requirement for class {} subject {} asks for {} periods/week, exceeding the {} slots in the week",
                    req.class_id, req.subject_id, req.periods_per_week, instance.days * instance.periods_per_day
                )));
            }
            requirements.insert((req.class_id.clone(), req.subject_id.clone()), req.periods_per_week);
        }

        let mut warnings = Vec::new();

        for ((class_id, subject_id), periods) in &requirements {
            if *periods == 0 {
                continue;
            }
            if !classes.contains_key(class_id) {
                return Err(EngineError::InvalidInput(format!(
                    "requirement references unknown class {class_id}"
                )));
            }
            let subject = subjects.get(subject_id).ok_or_else(|| {
                EngineError::InvalidInput(format!("requirement references unknown subject {subject_id}"))
            })?;
            let class = classes[class_id];

            let has_qualified_teacher = qualifications
                .iter()
                .any(|(_, s)| s == subject_id);
            if !has_qualified_teacher {
                return Err(EngineError::InvalidInput(format!(
                    "no qualified teacher exists for subject {subject_id} required by class {class_id}"
                )));
            }

            let has_suitable_room = rooms.values().any(|r| {
                r.capacity >= class.student_count && subject.required_features.is_subset(&r.features)
            });
            if !has_suitable_room {
                return Err(EngineError::InvalidInput(format!(
                    "no room has capacity and features for class {class_id} subject {subject_id}"
                )));
            }
        }

        let expanded_consecutive = expand_consecutive(&instance.consecutive, &classes, &requirements, &mut warnings);

        Ok(InputModel {
            instance,
            teachers,
            rooms,
            subjects,
            classes,
            qualifications,
            requirements,
            consecutive: expanded_consecutive,
            warnings,
        })
    }
}

/// Expands `ConsecutiveRequirement::scope == All` into one requirement per
/// class that actually has a matching subject requirement, and records a
/// warning (not an error — §4.1(iv)) for any block size that does not
/// divide its requirement's periods_per_week.
fn expand_consecutive(
    raw: &[ConsecutiveRequirement],
    classes: &BTreeMap<ClassId, &Class>,
    requirements: &BTreeMap<(ClassId, SubjectId), u32>,
    warnings: &mut Vec<String>,
) -> Vec<ConsecutiveRequirement> {
    let mut expanded = Vec::new();
    for req in raw {
        let class_ids: Vec<ClassId> = match &req.scope {
            ClassScope::Class(id) => vec![id.clone()],
            ClassScope::All => classes.keys().cloned().collect(),
        };
        for class_id in class_ids {
            let Some(&periods) = requirements.get(&(class_id.clone(), req.subject_id.clone())) else {
                continue;
            };
            if periods == 0 {
                continue;
            }
            if periods % req.block_size != 0 {
                warnings.push(format!(
                    "consecutive requirement for class {} subject {}: block size {} does not divide periods_per_week {}; the frequency constraint may render the model infeasible",
                    class_id, req.subject_id, req.block_size, periods
                ));
            }
            expanded.push(ConsecutiveRequirement {
                scope: ClassScope::Class(class_id),
                subject_id: req.subject_id.clone(),
                block_size: req.block_size,
            });
        }
    }
    expanded
}

/// A committed placement of one subject lesson (§3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub room_id: RoomId,
    pub day_of_week: Day,
    pub period: Period,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub total_assignments: u32,
    pub teachers_used: u32,
    pub rooms_used: u32,
    pub teacher_workload: BTreeMap<TeacherId, u32>,
    pub teacher_workload_stdev: f64,
    pub gaps_count: u32,
    pub preference_violations: u32,
    pub total_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub assignments: Vec<Assignment>,
    pub metrics: Metrics,
    pub total_score: i64,
}

/// Outcome status (§7). Not an [`std::error::Error`] — a successful-return
/// discriminant inside [`SolveOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Completed,
    TimedOut,
    Infeasible,
    InvalidInput(String),
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub candidates: Vec<Candidate>,
    /// True when `status == Completed` but the deadline elapsed before
    /// `solution_limit` distinct candidates were found.
    pub partial: bool,
}

impl SolveOutcome {
    pub fn empty(status: SolveStatus) -> Self {
        SolveOutcome {
            status,
            candidates: Vec::new(),
            partial: false,
        }
    }
}

/// Cooperative cancellation handle (§5). Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub solution_limit: usize,
    pub time_limit_seconds: u64,
    pub workers: u32,
    pub seed: Option<u64>,
    pub cancel: Option<CancellationHandle>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            solution_limit: 5,
            time_limit_seconds: 300,
            workers: 1,
            seed: None,
            cancel: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_instance() -> Instance {
        Instance {
            teachers: vec![Teacher {
                id: "t1".into(),
                availability: AvailabilityDoc::default(),
                preferences: PreferencesDoc::default(),
            }],
            rooms: vec![Room {
                id: "r1".into(),
                capacity: 30,
                features: BTreeSet::new(),
            }],
            subjects: vec![Subject {
                id: "s1".into(),
                required_features: BTreeSet::new(),
                default_periods_per_week: None,
            }],
            classes: vec![Class {
                id: "c1".into(),
                student_count: 20,
            }],
            qualifications: vec![("t1".into(), "s1".into())],
            requirements: vec![Requirement {
                class_id: "c1".into(),
                subject_id: "s1".into(),
                periods_per_week: 2,
            }],
            consecutive: vec![],
            days: 5,
            periods_per_day: 8,
        }
    }

    #[test]
    fn builds_from_minimal_valid_instance() {
        let instance = minimal_instance();
        let model = InputModel::build(&instance).expect("should validate");
        assert_eq!(model.requirements[&("c1".into(), "s1".into())], 2);
    }

    #[test]
    fn rejects_empty_teachers() {
        let mut instance = minimal_instance();
        instance.teachers.clear();
        let err = InputModel::build(&instance).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn rejects_missing_qualification() {
        let mut instance = minimal_instance();
        instance.qualifications.clear();
        let err = InputModel::build(&instance).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn rejects_missing_suitable_room() {
        let mut instance = minimal_instance();
        instance.classes[0].student_count = 50;
        instance.rooms[0].capacity = 20;
        let err = InputModel::build(&instance).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn warns_on_indivisible_block_size() {
        let mut instance = minimal_instance();
        instance.requirements[0].periods_per_week = 3;
        instance.consecutive.push(ConsecutiveRequirement {
            scope: ClassScope::Class("c1".into()),
            subject_id: "s1".into(),
            block_size: 2,
        });
        let model = InputModel::build(&instance).expect("still accepted, just warned");
        assert_eq!(model.warnings.len(), 1);
    }
}
