//! Emits hard constraints into the solver model (§4.4).
//!
//! Mirrors the teacher's constraint-emission idiom (`model.add_constraint(constraint!(...))`
//! built from `Expression`s summed out of filtered variable maps) but against
//! the richer projection indexes built by `variables`.

use std::collections::HashMap;

use good_lp::{constraint, Expression, SolverModel, Variable};
use log::info;

use crate::model::{ClassId, ClassScope, Day, InputModel, Period, SubjectId};
use crate::variables::VariableIndex;

/// "Block start" booleans, one per (class, subject, day, start_period) that
/// has room for a block of the requirement's size in the day.
pub struct ConsecutiveAux {
    pub starts: HashMap<(ClassId, SubjectId, Day, Period), Variable>,
}

/// Allocates the consecutive-block start variables. Must run while the
/// `ProblemVariables` is still open (i.e. before `.maximise(..).using(..)`),
/// same phase as `variables::build` and `objective::build_gap_aux`.
pub fn build_consecutive_aux(
    model: &InputModel,
    problem: &mut good_lp::ProblemVariables,
) -> ConsecutiveAux {
    use good_lp::variable;

    let days = model.instance.days as Day;
    let periods_per_day = model.instance.periods_per_day as Period;

    let mut starts = HashMap::new();
    for req in &model.consecutive {
        let ClassScope::Class(class_id) = &req.scope else {
            unreachable!("consecutive requirements are expanded to per-class scope by InputModel");
        };
        if periods_per_day < req.block_size as Period {
            continue;
        }
        for day in 0..days {
            for start in 0..=(periods_per_day - req.block_size as Period) {
                let var = problem.add(variable().binary());
                starts.insert(
                    (class_id.clone(), req.subject_id.clone(), day, start),
                    var,
                );
            }
        }
    }
    ConsecutiveAux { starts }
}

/// Emits hard constraints 1-7 into an already-created solver model.
pub fn encode(model: &mut impl SolverModel, input: &InputModel, index: &VariableIndex, aux: &ConsecutiveAux) {
    let mut count = 0u32;

    // 1. Teacher exclusion.
    for vars in index.by_teacher_slot.values() {
        let sum: Expression = vars.iter().map(|t| index.vars[t]).sum();
        model.add_constraint(constraint!(sum <= 1));
        count += 1;
    }

    // 2. Room exclusion.
    for vars in index.by_room_slot.values() {
        let sum: Expression = vars.iter().map(|t| index.vars[t]).sum();
        model.add_constraint(constraint!(sum <= 1));
        count += 1;
    }

    // 3. Class exclusion.
    for vars in index.by_class_slot.values() {
        let sum: Expression = vars.iter().map(|t| index.vars[t]).sum();
        model.add_constraint(constraint!(sum <= 1));
        count += 1;
    }

    // 4. Subject frequency.
    for ((class_id, subject_id), &periods_per_week) in &input.requirements {
        if periods_per_week == 0 {
            continue;
        }
        let Some(vars) = index.by_class_subject.get(&(class_id.clone(), subject_id.clone())) else {
            continue;
        };
        let sum: Expression = vars.iter().map(|t| index.vars[t]).sum();
        model.add_constraint(constraint!(sum == periods_per_week as f64));
        count += 1;
    }

    // 5 & 6. Daily and weekly workload caps.
    let teacher_days = crate::variables::teacher_days(index);
    for (teacher_id, days) in &teacher_days {
        let max_daily_load = input
            .teachers
            .get(teacher_id)
            .map(|t| t.preferences.max_daily_load)
            .unwrap_or(6) as f64;

        let mut weekly_terms: Vec<Variable> = Vec::new();
        for &day in days {
            let daily_terms: Vec<Variable> = index
                .by_teacher_slot
                .iter()
                .filter(|((t, d, _p), _)| t == teacher_id && *d == day)
                .flat_map(|(_, vars)| vars.iter().map(|t| index.vars[t]))
                .collect();
            let daily_sum: Expression = daily_terms.iter().copied().sum();
            model.add_constraint(constraint!(daily_sum <= max_daily_load));
            count += 1;
            weekly_terms.extend(daily_terms);
        }
        let weekly_sum: Expression = weekly_terms.iter().copied().sum();
        model.add_constraint(constraint!(weekly_sum <= 30.0));
        count += 1;
    }

    // 7. Consecutive blocks.
    encode_consecutive(model, input, index, aux, &mut count);

    info!("constraint encoder: {count} constraints added");
}

fn encode_consecutive(
    model: &mut impl SolverModel,
    input: &InputModel,
    index: &VariableIndex,
    aux: &ConsecutiveAux,
    count: &mut u32,
) {
    let days = input.instance.days as Day;
    let periods_per_day = input.instance.periods_per_day as Period;

    for req in &input.consecutive {
        let ClassScope::Class(class_id) = &req.scope else {
            unreachable!();
        };
        let block_size = req.block_size as Period;
        if periods_per_day < block_size {
            continue;
        }

        let periods_per_week = *input
            .requirements
            .get(&(class_id.clone(), req.subject_id.clone()))
            .unwrap_or(&0);
        if periods_per_week == 0 {
            continue;
        }

        // Per-slot occupancy must equal the set of block starts covering it.
        // This single equality both forces a start to 0 when the block would
        // touch a slot with no legal variable, and forbids an occupied slot
        // outside of any block (the partition requirement in invariant 8 —
        // stronger than the implication alone, since "start=1 => occupied"
        // does not by itself rule out stray single occupied periods).
        for day in 0..days {
            for p in 0..periods_per_day {
                let occupied: Expression = index
                    .by_class_subject_day_slot
                    .get(&(class_id.clone(), req.subject_id.clone(), day, p))
                    .map(|vars| vars.iter().map(|t| index.vars[t]).sum())
                    .unwrap_or_else(|| Expression::from(0.0));

                let covering_starts: Vec<Variable> = (0..=(periods_per_day - block_size))
                    .filter(|&start| start <= p && p < start + block_size)
                    .filter_map(|start| {
                        aux.starts
                            .get(&(class_id.clone(), req.subject_id.clone(), day, start))
                            .copied()
                    })
                    .collect();
                let covered: Expression = covering_starts.iter().copied().sum();

                model.add_constraint(constraint!(occupied == covered.clone()));
                *count += 1;

                // No two starts covering the same slot (overlap guard); also
                // derivable from class-exclusion, kept explicit per spec.md.
                if covering_starts.len() > 1 {
                    let sum: Expression = covering_starts.iter().copied().sum();
                    model.add_constraint(constraint!(sum <= 1));
                    *count += 1;
                }
            }
        }

        let required_starts = (periods_per_week / block_size as u32) as f64;
        let all_starts: Vec<Variable> = (0..days)
            .flat_map(|day| {
                (0..=(periods_per_day - block_size)).filter_map(move |start| {
                    aux.starts
                        .get(&(class_id.clone(), req.subject_id.clone(), day, start))
                        .copied()
                })
            })
            .collect();
        let sum: Expression = all_starts.iter().copied().sum();
        model.add_constraint(constraint!(sum == required_starts));
        *count += 1;
    }
}
