//! Runs the ILP backend under a time limit, collecting up to *K* distinct
//! solutions (§4.6).
//!
//! The teacher's backend (`good_lp` + HiGHS) solves one optimum per
//! `.solve()` call and consumes the model. *K*-distinct-solution enumeration
//! is implemented as the standard MIP idiom: solve, extract, add a no-good
//! cut excluding that exact assignment vector, rebuild, re-solve — repeating
//! until `solution_limit` solutions are collected, the deadline elapses, or
//! the (cut-augmented) model goes infeasible. See SPEC_FULL.md §4.6.

use std::time::{Duration, Instant};

use good_lp::{constraint, default_solver, Expression, ProblemVariables, Solution, SolverModel};
use log::{info, warn};

use crate::constraints;
use crate::error::EngineError;
use crate::model::{InputModel, SolveOptions};
use crate::objective;
use crate::variables::{self, VariableIndex};

/// One raw, still-unscored solver solution: the set of decision-variable
/// tuples that were assigned 1.
pub struct RawSolution {
    pub assignments: Vec<variables::Tuple>,
}

pub struct DriverOutcome {
    pub solutions: Vec<RawSolution>,
    pub timed_out: bool,
    pub cancelled: bool,
    pub infeasible_from_start: bool,
}

pub fn run(model: &InputModel, opts: &SolveOptions) -> Result<DriverOutcome, EngineError> {
    let deadline = Instant::now() + Duration::from_secs(opts.time_limit_seconds);
    let availability = crate::availability::resolve(model);

    let mut solutions: Vec<RawSolution> = Vec::new();
    // No-good cuts from previously found solutions, carried across rebuilds.
    let mut excluded: Vec<Vec<variables::Tuple>> = Vec::new();
    let mut infeasible_from_start = false;
    let mut timed_out = false;
    let mut cancelled = false;

    loop {
        if solutions.len() >= opts.solution_limit {
            break;
        }
        if let Some(cancel) = &opts.cancel {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
        }
        if Instant::now() >= deadline {
            timed_out = true;
            break;
        }

        match solve_once(model, &availability, opts, &excluded, deadline) {
            SingleSolveResult::Found(raw) => {
                excluded.push(raw.assignments.clone());
                solutions.push(raw);
            }
            SingleSolveResult::Infeasible => {
                if solutions.is_empty() {
                    infeasible_from_start = true;
                }
                break;
            }
            SingleSolveResult::TimedOut => {
                timed_out = true;
                break;
            }
        }
    }

    info!(
        "solver driver: collected {} of {} requested solutions (timed_out={}, cancelled={})",
        solutions.len(),
        opts.solution_limit,
        timed_out,
        cancelled
    );

    Ok(DriverOutcome {
        solutions,
        timed_out,
        cancelled,
        infeasible_from_start,
    })
}

enum SingleSolveResult {
    Found(RawSolution),
    Infeasible,
    TimedOut,
}

fn solve_once(
    model: &InputModel,
    availability: &crate::availability::ResolvedAvailability,
    opts: &SolveOptions,
    excluded: &[Vec<variables::Tuple>],
    deadline: Instant,
) -> SingleSolveResult {
    let mut problem = ProblemVariables::new();

    let var_index = match variables::build(model, availability, &mut problem) {
        Ok(idx) => idx,
        Err(_) => return SingleSolveResult::Infeasible,
    };
    let gap_aux = objective::build_gap_aux(model, &var_index, &mut problem);
    let consecutive_aux = constraints::build_consecutive_aux(model, &mut problem);

    let objective_expr = objective::build(model, &var_index, &gap_aux);

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return SingleSolveResult::TimedOut;
    }

    let mut solver_model = problem
        .maximise(objective_expr)
        .using(default_solver)
        .set_option("threads", opts.workers as i32)
        .set_option("random_seed", opts.seed.unwrap_or(1234) as i32)
        .set_option("time_limit", remaining.as_secs_f64())
        .set_option("log_to_console", "false");

    constraints::encode(&mut solver_model, model, &var_index, &consecutive_aux);
    objective::encode_gap_constraints(&mut solver_model, model, &var_index, &gap_aux);
    add_no_good_cuts(&mut solver_model, &var_index, excluded);

    match solver_model.solve() {
        Ok(solution) => {
            let assignments: Vec<variables::Tuple> = var_index
                .vars
                .iter()
                .filter(|(_, &var)| solution.value(var) > 0.5)
                .map(|(tuple, _)| tuple.clone())
                .collect();
            SingleSolveResult::Found(RawSolution { assignments })
        }
        Err(e) => {
            warn!("solve attempt did not produce a feasible solution: {e}");
            SingleSolveResult::Infeasible
        }
    }
}

/// Excludes exactly the assignment vectors already collected: forbids the
/// same set of "on" variables from recurring by requiring at least one of
/// them to now be 0. Paired with subject-frequency equality constraints
/// (which fix the total "on" count per class/subject), this is sufficient
/// to exclude exactly the prior solution rather than a superset of it.
fn add_no_good_cuts(
    model: &mut impl SolverModel,
    index: &VariableIndex,
    excluded: &[Vec<variables::Tuple>],
) {
    for prior in excluded {
        let on: Expression = prior.iter().filter_map(|t| index.vars.get(t)).copied().sum();
        let n = prior.len() as f64;
        model.add_constraint(constraint!(on <= n - 1.0));
    }
}
