//! Recurrence resolver.
//!
//! Normalizes a [`ScheduleRequest`] into a [`ResolvedPlan`]: the start
//! instant, a [`TerminationRule`], the ordered stage templates, and the
//! cyclic pause. All request-level problems are collected in one pass.
//!
//! # Budget Derivation
//!
//! | Mode | Termination |
//! |------|-------------|
//! | Single | `EndAt(process_end)` |
//! | Cyclic | `HoursBudget(Σ duration × cycle_count)` |
//! | Periodic | `HoursBudget(total_hours)` |
//!
//! Budgets and pauses are carried as exact ticks in the plan. The cyclic
//! budget is summed in the same representation the expander accumulates in,
//! so the expansion loop lands exactly on it, even past the per-value hours
//! limit.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::config::CompilerConfig;
use crate::error::{CompileError, RequestError, RequestErrorKind};
use crate::models::{
    RecurrenceKind, RecurrencePolicy, ScheduleRequest, StageTemplate, StageTiming,
};
use crate::time;

/// When expansion stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationRule {
    /// Stop at an explicit instant (single mode).
    EndAt(NaiveDateTime),
    /// Stop once this many hours of stages have been emitted.
    HoursBudget(f64),
}

/// Normalized, mode-independent view of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan<'a> {
    /// Recurrence mode.
    pub kind: RecurrenceKind,
    /// Process start.
    pub start: NaiveDateTime,
    /// Stopping condition.
    pub termination: TerminationRule,
    /// Stage templates in execution order.
    pub templates: &'a [StageTemplate],
    /// Idle time inserted between cyclic passes (h). Zero otherwise.
    pub pause_hours: f64,
    /// Expected end of the process, pauses included.
    pub process_end: NaiveDateTime,
    /// Exact hours budget in ticks. Zero in single mode.
    pub budget_ticks: i64,
    /// Exact cyclic pause in ticks. Zero otherwise.
    pub pause_ticks: i64,
}

/// Resolves a request into a plan.
///
/// In single mode the start is the first stage's start instant; the
/// request's own `start` is only used when there is no such stage.
///
/// # Errors
/// [`CompileError::Request`] listing every malformed field, or
/// [`CompileError::TimeOutOfRange`] if the process end is not representable.
pub fn resolve<'a>(
    request: &'a ScheduleRequest,
    config: &CompilerConfig,
) -> Result<ResolvedPlan<'a>, CompileError> {
    let mut errors = Vec::new();
    let kind = request.kind();

    if request.process_name.trim().is_empty() {
        errors.push(RequestError::new(
            RequestErrorKind::EmptyName,
            "process_name",
            "process name must not be blank",
        ));
    }

    if request.stages.len() < kind.min_stages() {
        errors.push(RequestError::new(
            RequestErrorKind::TooFewStages,
            "stages",
            format!(
                "{:?} processes need at least {} stage(s), got {}",
                kind,
                kind.min_stages(),
                request.stages.len()
            ),
        ));
    }

    let durations = check_stages(request, &mut errors);

    let plan = match request.policy {
        RecurrencePolicy::Single { process_end } => {
            let start = request
                .stages
                .first()
                .and_then(StageTemplate::start)
                .unwrap_or(request.start);
            resolve_single(request, start, process_end, config, &mut errors);
            ResolvedPlan {
                kind,
                start,
                termination: TerminationRule::EndAt(process_end),
                templates: &request.stages,
                pause_hours: 0.0,
                process_end,
                budget_ticks: 0,
                pause_ticks: 0,
            }
        }
        RecurrencePolicy::Cyclic {
            cycle_count,
            pause_hours,
        } => {
            check_not_before(request.start, config, &mut errors);
            let (budget_ticks, pause_ticks) =
                resolve_cyclic(cycle_count, pause_hours, durations.as_deref(), &mut errors);
            let pauses = pause_ticks.saturating_mul(i64::from(cycle_count.saturating_sub(1)));
            let span = budget_ticks.saturating_add(pauses);
            ResolvedPlan {
                kind,
                start: request.start,
                termination: TerminationRule::HoursBudget(time::ticks_to_hours(budget_ticks)),
                templates: &request.stages,
                pause_hours: time::ticks_to_hours(pause_ticks),
                process_end: end_after(request.start, span, &errors)?,
                budget_ticks,
                pause_ticks,
            }
        }
        RecurrencePolicy::Periodic { total_hours } => {
            check_not_before(request.start, config, &mut errors);
            let budget_ticks =
                resolve_periodic(total_hours, durations.as_deref(), config, &mut errors);
            ResolvedPlan {
                kind,
                start: request.start,
                termination: TerminationRule::HoursBudget(total_hours),
                templates: &request.stages,
                pause_hours: 0.0,
                process_end: end_after(request.start, budget_ticks, &errors)?,
                budget_ticks,
                pause_ticks: 0,
            }
        }
    };

    if errors.is_empty() {
        if let (Some(max), Some(ticks)) = (config.max_stage_instances, durations.as_deref()) {
            let projected = projected_instances(&plan, ticks);
            if projected > max as u128 {
                errors.push(RequestError::new(
                    RequestErrorKind::TooManyInstances,
                    "stages",
                    format!("request expands to {projected} stage instances, limit is {max}"),
                ));
            }
        }
    }

    if !errors.is_empty() {
        return Err(CompileError::Request(errors));
    }

    debug!(
        kind = ?plan.kind,
        start = %time::format_wire(plan.start),
        termination = ?plan.termination,
        templates = plan.templates.len(),
        "resolved recurrence plan"
    );
    Ok(plan)
}

/// Checks names and timings of every stage template.
///
/// Returns per-template duration ticks when the mode is duration-based and
/// every duration is valid.
fn check_stages(request: &ScheduleRequest, errors: &mut Vec<RequestError>) -> Option<Vec<i64>> {
    let expects_durations = request.kind() != RecurrenceKind::Single;
    let mut ticks = Vec::with_capacity(request.stages.len());
    let mut all_valid = true;

    for (i, stage) in request.stages.iter().enumerate() {
        if stage.name.trim().is_empty() {
            errors.push(RequestError::new(
                RequestErrorKind::EmptyName,
                format!("stages[{i}].name"),
                "stage name must not be blank",
            ));
        }

        match (stage.timing, expects_durations) {
            (StageTiming::Lasts { hours }, true) => match positive_ticks(hours) {
                Ok(t) => ticks.push(t),
                Err(problem) => {
                    all_valid = false;
                    errors.push(problem.into_error(
                        RequestErrorKind::NonPositiveDuration,
                        format!("stages[{i}].duration_hours"),
                        "duration",
                        hours,
                    ));
                }
            },
            (StageTiming::StartsAt(_), false) => {}
            (_, expects) => {
                all_valid = false;
                errors.push(RequestError::new(
                    RequestErrorKind::TimingMismatch,
                    format!("stages[{i}].timing"),
                    if expects {
                        format!("{:?} stages need a duration, not a start instant", request.kind())
                    } else {
                        "single-run stages need a start instant, not a duration".to_string()
                    },
                ));
            }
        }
    }

    (expects_durations && all_valid).then_some(ticks)
}

fn check_not_before(
    start: NaiveDateTime,
    config: &CompilerConfig,
    errors: &mut Vec<RequestError>,
) {
    if let Some(not_before) = config.not_before {
        if start < not_before {
            errors.push(RequestError::new(
                RequestErrorKind::StartsInPast,
                "start",
                format!(
                    "start {} is before {}",
                    time::format_wire(start),
                    time::format_wire(not_before)
                ),
            ));
        }
    }
}

fn resolve_single(
    request: &ScheduleRequest,
    start: NaiveDateTime,
    process_end: NaiveDateTime,
    config: &CompilerConfig,
    errors: &mut Vec<RequestError>,
) {
    if request.stages.is_empty() {
        return;
    }

    if process_end <= start {
        errors.push(RequestError::new(
            RequestErrorKind::InvertedInstants,
            "process_end",
            format!(
                "process end {} must come after start {}",
                time::format_wire(process_end),
                time::format_wire(start)
            ),
        ));
    }

    if let Some(not_before) = config.not_before {
        for (i, stage) in request.stages.iter().enumerate() {
            if stage.start().is_some_and(|t| t < not_before) {
                errors.push(RequestError::new(
                    RequestErrorKind::StartsInPast,
                    format!("stages[{i}].start"),
                    "stage starts before the allowed lower bound",
                ));
            }
        }
        if process_end < not_before {
            errors.push(RequestError::new(
                RequestErrorKind::StartsInPast,
                "process_end",
                "process end is before the allowed lower bound",
            ));
        }
    }
}

/// Returns `(budget_ticks, pause_ticks)`.
fn resolve_cyclic(
    cycle_count: u32,
    pause_hours: f64,
    durations: Option<&[i64]>,
    errors: &mut Vec<RequestError>,
) -> (i64, i64) {
    if cycle_count < 1 {
        errors.push(RequestError::new(
            RequestErrorKind::InvalidCycleCount,
            "cycle_count",
            "cycle count must be at least 1",
        ));
    }

    let pause_ticks = match time::hours_to_ticks(pause_hours) {
        Some(t) if t >= 0 => t,
        None if pause_hours > time::MAX_HOURS => {
            errors.push(HoursProblem::OutOfRange.into_error(
                RequestErrorKind::InvalidPause,
                "pause_hours",
                "pause",
                pause_hours,
            ));
            0
        }
        _ => {
            errors.push(RequestError::new(
                RequestErrorKind::InvalidPause,
                "pause_hours",
                format!("pause must be zero or a positive number of hours, got {pause_hours}"),
            ));
            0
        }
    };

    let cycle_ticks = durations
        .map(|d| d.iter().try_fold(0i64, |sum, &t| sum.checked_add(t)))
        .unwrap_or(Some(0));
    let budget_ticks = match cycle_ticks.and_then(|c| c.checked_mul(i64::from(cycle_count))) {
        Some(b) => b,
        None => {
            errors.push(RequestError::new(
                RequestErrorKind::OutOfRange,
                "cycle_count",
                "total cyclic duration is too large to schedule",
            ));
            0
        }
    };

    (budget_ticks, pause_ticks)
}

/// Returns the budget in ticks.
fn resolve_periodic(
    total_hours: f64,
    durations: Option<&[i64]>,
    config: &CompilerConfig,
    errors: &mut Vec<RequestError>,
) -> i64 {
    let budget_ticks = match positive_ticks(total_hours) {
        Ok(t) => t,
        Err(problem) => {
            errors.push(problem.into_error(
                RequestErrorKind::NonPositiveBudget,
                "total_hours",
                "total hours",
                total_hours,
            ));
            return 0;
        }
    };

    let checked_pass = durations.filter(|_| config.reject_oversized_pass);
    if let Some(durations) = checked_pass {
        let pass_ticks = durations.iter().fold(0i64, |sum, &t| sum.saturating_add(t));
        if pass_ticks > budget_ticks {
            errors.push(RequestError::new(
                RequestErrorKind::StagesExceedBudget,
                "stages",
                format!(
                    "one pass over the stages takes {}h, more than the {}h budget",
                    time::ticks_to_hours(pass_ticks),
                    total_hours
                ),
            ));
        }
    }

    budget_ticks
}

/// Why an hours value could not be turned into a positive tick count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoursProblem {
    /// Zero, negative, NaN, or below one tick.
    NotPositive,
    /// Beyond [`time::MAX_HOURS`].
    OutOfRange,
}

impl HoursProblem {
    fn into_error(
        self,
        not_positive: RequestErrorKind,
        field: impl Into<String>,
        what: &str,
        hours: f64,
    ) -> RequestError {
        match self {
            Self::NotPositive => RequestError::new(
                not_positive,
                field,
                format!("{what} must be a positive number of hours, got {hours}"),
            ),
            Self::OutOfRange => RequestError::new(
                RequestErrorKind::OutOfRange,
                field,
                format!("{what} of {hours}h exceeds the {}h limit", time::MAX_HOURS),
            ),
        }
    }
}

/// Converts strictly positive hours to ticks; the result is at least one tick.
fn positive_ticks(hours: f64) -> Result<i64, HoursProblem> {
    if hours.is_nan() || hours <= 0.0 {
        return Err(HoursProblem::NotPositive);
    }
    match time::hours_to_ticks(hours) {
        Some(t) if t > 0 => Ok(t),
        Some(_) => Err(HoursProblem::NotPositive),
        None => Err(HoursProblem::OutOfRange),
    }
}

/// Start shifted by `ticks`, or the start itself when the request is already rejected.
fn end_after(
    start: NaiveDateTime,
    ticks: i64,
    errors: &[RequestError],
) -> Result<NaiveDateTime, CompileError> {
    if errors.is_empty() {
        time::add_ticks(start, ticks)
    } else {
        Ok(start)
    }
}

/// Exact number of instances the expander will emit.
fn projected_instances(plan: &ResolvedPlan<'_>, durations: &[i64]) -> u128 {
    if plan.kind == RecurrenceKind::Single {
        return plan.templates.len() as u128;
    }
    let budget = plan.budget_ticks;
    let pass: i64 = durations.iter().sum();
    if pass <= 0 {
        return 0;
    }

    let full_passes = (budget / pass) as u128;
    let mut remaining = budget % pass;
    let mut partial = 0u128;
    for &d in durations {
        if remaining <= 0 {
            break;
        }
        partial += 1;
        remaining -= d;
    }
    full_passes * durations.len() as u128 + partial
}
