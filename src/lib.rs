//! Multi-solution weekly timetable generator.
//!
//! Given a scheduling [`Instance`] (teachers, rooms, subjects, classes,
//! qualifications, per-class-subject requirements, availability and
//! preferences), [`solve`] searches for up to `solution_limit` distinct
//! conflict-free weekly timetables and returns them ranked best-first.
//!
//! The pipeline is a straight-line sequence of single-purpose stages, each
//! its own module:
//!
//! 1. [`model`] — validates the raw [`Instance`] into an [`InputModel`].
//! 2. [`availability`] — resolves per-teacher availability documents.
//! 3. [`variables`] — enumerates legal decision variables.
//! 4. [`constraints`] — encodes hard constraints.
//! 5. [`objective`] — encodes the soft objective the solver maximizes.
//! 6. [`solver`] — drives the ILP backend, collecting K distinct solutions.
//! 7. [`extract`] — converts raw solver output into [`Assignment`]s.
//! 8. [`metrics`] — computes exact, audit-reproducible quality metrics.
//! 9. [`packager`] — re-validates, deduplicates, and ranks candidates.

pub mod availability;
pub mod constraints;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod model;
pub mod objective;
pub mod packager;
pub mod solver;
pub mod variables;

pub use error::EngineError;
pub use model::{
    Assignment, AvailabilityDoc, CancellationHandle, Candidate, Class, ClassId, ClassScope,
    ConsecutiveRequirement, DayAvailability, Instance, InputModel, Metrics, PreferencesDoc,
    Requirement, Room, RoomId, SolveOptions, SolveOutcome, SolveStatus, Subject, SubjectId,
    Teacher, TeacherId,
};

use log::{error, info};

/// Runs the full pipeline for one [`Instance`], returning up to
/// `opts.solution_limit` distinct timetables ranked best-first (§7).
///
/// Never panics on malformed input: validation failures surface as
/// `SolveStatus::InvalidInput` inside a normal `Ok(SolveOutcome)`, matching
/// the "errors are data, not panics" posture of the rest of the pipeline.
/// The only way this returns `Err` is an internal invariant violation that
/// indicates a bug in this crate, not in the caller's input.
pub fn solve(instance: &Instance, opts: SolveOptions) -> Result<SolveOutcome, EngineError> {
    let model = match InputModel::build(instance) {
        Ok(model) => model,
        Err(EngineError::InvalidInput(msg)) => {
            info!("solve: rejected invalid input: {msg}");
            return Ok(SolveOutcome::empty(SolveStatus::InvalidInput(msg)));
        }
        Err(other) => return Err(other),
    };

    for warning in &model.warnings {
        log::warn!("solve: {warning}");
    }

    let driver_outcome = solver::run(&model, &opts)?;

    if driver_outcome.infeasible_from_start {
        info!("solve: no feasible timetable exists for this instance");
        return Ok(SolveOutcome::empty(SolveStatus::Infeasible));
    }

    let raw_candidates: Vec<(Vec<Assignment>, Metrics)> = driver_outcome
        .solutions
        .iter()
        .map(|raw| {
            let assignments = extract::extract(raw);
            let metrics = metrics::evaluate(&model, &assignments);
            (assignments, metrics)
        })
        .collect();

    let candidates = packager::package(&model, raw_candidates);

    if candidates.is_empty() {
        error!("solve: solver reported solutions but none survived re-validation");
        return Ok(SolveOutcome::empty(SolveStatus::Infeasible));
    }

    let partial = (driver_outcome.timed_out || driver_outcome.cancelled)
        && candidates.len() < opts.solution_limit;

    let status = if driver_outcome.cancelled && candidates.is_empty() {
        SolveStatus::Cancelled
    } else {
        SolveStatus::Completed
    };

    info!(
        "solve: returning {} candidate(s), status={:?}, partial={}",
        candidates.len(),
        status,
        partial
    );

    Ok(SolveOutcome {
        status,
        candidates,
        partial,
    })
}
