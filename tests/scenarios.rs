//! End-to-end scenarios mirroring the worked examples used to validate this
//! engine during design: a minimal feasible instance, infeasibility from
//! missing capacity/qualification, a shared-teacher bottleneck, a
//! consecutive-block requirement, and a preference-driven ranking.

use std::collections::BTreeSet;

use timetable_engine::{
    solve, AvailabilityDoc, Class, ClassScope, ConsecutiveRequirement, Instance, PreferencesDoc,
    Requirement, Room, SolveOptions, SolveStatus, Subject, Teacher,
};

fn teacher(id: &str) -> Teacher {
    Teacher {
        id: id.into(),
        availability: AvailabilityDoc::default(),
        preferences: PreferencesDoc::default(),
    }
}

fn room(id: &str, capacity: u32) -> Room {
    Room {
        id: id.into(),
        capacity,
        features: BTreeSet::new(),
    }
}

fn subject(id: &str) -> Subject {
    Subject {
        id: id.into(),
        required_features: BTreeSet::new(),
        default_periods_per_week: None,
    }
}

fn opts(limit: usize) -> SolveOptions {
    SolveOptions {
        solution_limit: limit,
        time_limit_seconds: 30,
        ..Default::default()
    }
}

/// E1 — minimal feasible instance: 1 class, 2 subjects at 2/wk each, 2
/// teachers each qualified for one subject, unrestricted availability.
#[test]
fn e1_minimal_feasible() {
    let instance = Instance {
        teachers: vec![teacher("t1"), teacher("t2")],
        rooms: vec![room("r1", 30)],
        subjects: vec![subject("s1"), subject("s2")],
        classes: vec![Class {
            id: "c1".into(),
            student_count: 20,
        }],
        qualifications: vec![("t1".into(), "s1".into()), ("t2".into(), "s2".into())],
        requirements: vec![
            Requirement {
                class_id: "c1".into(),
                subject_id: "s1".into(),
                periods_per_week: 2,
            },
            Requirement {
                class_id: "c1".into(),
                subject_id: "s2".into(),
                periods_per_week: 2,
            },
        ],
        consecutive: vec![],
        days: 5,
        periods_per_day: 8,
    };

    let outcome = solve(&instance, opts(5)).unwrap();
    assert_eq!(outcome.status, SolveStatus::Completed);
    assert!(!outcome.candidates.is_empty());
    let best = &outcome.candidates[0];
    assert_eq!(best.assignments.len(), 4);
    assert_eq!(best.metrics.gaps_count, 0);
    assert_eq!(best.total_score, 40);
}

/// E2 — a class too large for the only room makes the instance rejected at
/// validation time, before any solve is attempted.
#[test]
fn e2_capacity_infeasibility() {
    let instance = Instance {
        teachers: vec![teacher("t1"), teacher("t2")],
        rooms: vec![room("r1", 20)],
        subjects: vec![subject("s1"), subject("s2")],
        classes: vec![Class {
            id: "c1".into(),
            student_count: 50,
        }],
        qualifications: vec![("t1".into(), "s1".into()), ("t2".into(), "s2".into())],
        requirements: vec![
            Requirement {
                class_id: "c1".into(),
                subject_id: "s1".into(),
                periods_per_week: 2,
            },
            Requirement {
                class_id: "c1".into(),
                subject_id: "s2".into(),
                periods_per_week: 2,
            },
        ],
        consecutive: vec![],
        days: 5,
        periods_per_day: 8,
    };

    let outcome = solve(&instance, opts(5)).unwrap();
    assert!(matches!(outcome.status, SolveStatus::InvalidInput(_)));
    assert!(outcome.candidates.is_empty());
}

/// E3 — no qualified teacher for a required subject is also an
/// input-validation rejection.
#[test]
fn e3_qualification_infeasibility() {
    let instance = Instance {
        teachers: vec![teacher("t1"), teacher("t2")],
        rooms: vec![room("r1", 30)],
        subjects: vec![subject("s1"), subject("s2")],
        classes: vec![Class {
            id: "c1".into(),
            student_count: 20,
        }],
        qualifications: vec![],
        requirements: vec![
            Requirement {
                class_id: "c1".into(),
                subject_id: "s1".into(),
                periods_per_week: 2,
            },
            Requirement {
                class_id: "c1".into(),
                subject_id: "s2".into(),
                periods_per_week: 2,
            },
        ],
        consecutive: vec![],
        days: 5,
        periods_per_day: 8,
    };

    let outcome = solve(&instance, opts(5)).unwrap();
    assert!(matches!(outcome.status, SolveStatus::InvalidInput(_)));
    assert!(outcome.candidates.is_empty());
}

/// E4 — a single teacher is the only one qualified for two subjects needed
/// by two classes; every candidate must still respect teacher exclusion.
#[test]
fn e4_teacher_bottleneck() {
    let instance = Instance {
        teachers: vec![teacher("t1")],
        rooms: vec![room("r1", 30), room("r2", 30)],
        subjects: vec![subject("s1"), subject("s2")],
        classes: vec![
            Class {
                id: "c1".into(),
                student_count: 20,
            },
            Class {
                id: "c2".into(),
                student_count: 20,
            },
        ],
        qualifications: vec![("t1".into(), "s1".into()), ("t1".into(), "s2".into())],
        requirements: vec![
            Requirement {
                class_id: "c1".into(),
                subject_id: "s1".into(),
                periods_per_week: 2,
            },
            Requirement {
                class_id: "c1".into(),
                subject_id: "s2".into(),
                periods_per_week: 2,
            },
            Requirement {
                class_id: "c2".into(),
                subject_id: "s1".into(),
                periods_per_week: 2,
            },
            Requirement {
                class_id: "c2".into(),
                subject_id: "s2".into(),
                periods_per_week: 2,
            },
        ],
        consecutive: vec![],
        days: 5,
        periods_per_day: 8,
    };

    let outcome = solve(&instance, opts(3)).unwrap();
    assert_eq!(outcome.status, SolveStatus::Completed);
    for candidate in &outcome.candidates {
        assert_eq!(candidate.assignments.len(), 8);
        let mut seen = BTreeSet::new();
        for a in &candidate.assignments {
            assert!(
                seen.insert((a.teacher_id.clone(), a.day_of_week, a.period)),
                "teacher double-booked within a single candidate"
            );
        }
    }
}

/// E5 — a consecutive-block requirement forces every weekly occurrence of
/// the subject into a 2-period block with no loose single periods.
#[test]
fn e5_consecutive_block() {
    let instance = Instance {
        teachers: vec![teacher("t1")],
        rooms: vec![room("r1", 30)],
        subjects: vec![subject("s1")],
        classes: vec![Class {
            id: "c1".into(),
            student_count: 20,
        }],
        qualifications: vec![("t1".into(), "s1".into())],
        requirements: vec![Requirement {
            class_id: "c1".into(),
            subject_id: "s1".into(),
            periods_per_week: 4,
        }],
        consecutive: vec![ConsecutiveRequirement {
            scope: ClassScope::Class("c1".into()),
            subject_id: "s1".into(),
            block_size: 2,
        }],
        days: 5,
        periods_per_day: 8,
    };

    let outcome = solve(&instance, opts(1)).unwrap();
    assert_eq!(outcome.status, SolveStatus::Completed);
    let best = &outcome.candidates[0];
    assert_eq!(best.assignments.len(), 4);

    let mut by_day: std::collections::BTreeMap<u8, Vec<u8>> = std::collections::BTreeMap::new();
    for a in &best.assignments {
        by_day.entry(a.day_of_week).or_default().push(a.period);
    }
    for periods in by_day.values_mut() {
        periods.sort();
        assert_eq!(periods.len(), 2, "each occupied day must hold exactly one 2-period block");
        assert_eq!(periods[1], periods[0] + 1, "the two periods must be consecutive");
    }
    assert_eq!(by_day.len(), 2, "4 periods at block size 2 means exactly 2 blocks");
}

/// E6 — two interchangeable teachers with opposite time-of-day preferences;
/// the top-ranked candidate should honor both preferences with zero
/// violations.
#[test]
fn e6_preference_objective() {
    let instance = Instance {
        teachers: vec![
            Teacher {
                id: "t1".into(),
                availability: AvailabilityDoc::default(),
                preferences: PreferencesDoc {
                    prefers_morning: true,
                    ..Default::default()
                },
            },
            Teacher {
                id: "t2".into(),
                availability: AvailabilityDoc::default(),
                preferences: PreferencesDoc {
                    prefers_afternoon: true,
                    ..Default::default()
                },
            },
        ],
        rooms: vec![room("r1", 30)],
        subjects: vec![subject("s1"), subject("s2")],
        classes: vec![Class {
            id: "c1".into(),
            student_count: 20,
        }],
        qualifications: vec![
            ("t1".into(), "s1".into()),
            ("t1".into(), "s2".into()),
            ("t2".into(), "s1".into()),
            ("t2".into(), "s2".into()),
        ],
        requirements: vec![
            Requirement {
                class_id: "c1".into(),
                subject_id: "s1".into(),
                periods_per_week: 2,
            },
            Requirement {
                class_id: "c1".into(),
                subject_id: "s2".into(),
                periods_per_week: 2,
            },
        ],
        consecutive: vec![],
        days: 5,
        periods_per_day: 8,
    };

    let outcome = solve(&instance, opts(1)).unwrap();
    assert_eq!(outcome.status, SolveStatus::Completed);
    let best = &outcome.candidates[0];
    assert_eq!(best.metrics.preference_violations, 0);

    let morning_cutoff = 4u8;
    for a in &best.assignments {
        if a.teacher_id == "t1".into() {
            assert!(a.period < morning_cutoff);
        } else if a.teacher_id == "t2".into() {
            assert!(a.period >= morning_cutoff);
        }
    }
}
