//! Timeline validation and packaging.
//!
//! Checks the global invariants of an expanded timeline before it may leave
//! the compiler:
//! - Stage count at or above the mode minimum
//! - Every effective duration strictly positive
//! - Humidity within the configured range, temperature finite
//! - Each stage starts where the previous one ended (plus any cyclic pause)
//! - Positive total hours, and a process end matching the last stage's end
//!
//! Every violation is reported, not just the first.

use crate::config::CompilerConfig;
use crate::error::{CompileError, ValidationError, ValidationErrorKind};
use crate::models::{CompiledSchedule, RecurrenceKind, ScheduleRequest, StageInstance};
use crate::recurrence::ResolvedPlan;
use crate::time;
use chrono::NaiveDateTime;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validates an expanded timeline.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_timeline(
    kind: RecurrenceKind,
    stages: &[StageInstance],
    process_end: NaiveDateTime,
    config: &CompilerConfig,
) -> ValidationResult {
    let mut errors = Vec::new();
    let tolerance = config.contiguity_tolerance_hours;

    if stages.len() < kind.min_stages() {
        errors.push(ValidationError::new(
            ValidationErrorKind::TooFewStages,
            format!(
                "{:?} timelines need at least {} stage instance(s), got {}",
                kind,
                kind.min_stages(),
                stages.len()
            ),
        ));
    }

    for (i, stage) in stages.iter().enumerate() {
        let duration = stage.effective_duration_hours;
        if !(duration > 0.0 && duration.is_finite()) {
            errors.push(ValidationError::at_stage(
                ValidationErrorKind::NonPositiveDuration,
                i,
                format!("'{}' has non-positive duration {duration}h", stage.label),
            ));
        }

        if let Some(h) = stage.humidity_pct {
            if !config.humidity_in_range(h) {
                errors.push(ValidationError::at_stage(
                    ValidationErrorKind::HumidityOutOfRange,
                    i,
                    format!(
                        "'{}' humidity {h} outside [{}, {}]",
                        stage.label, config.humidity_min, config.humidity_max
                    ),
                ));
            }
        }

        if !stage.temperature_c.is_finite() {
            errors.push(ValidationError::at_stage(
                ValidationErrorKind::InvalidTemperature,
                i,
                format!("'{}' temperature is not a number", stage.label),
            ));
        }
    }

    for (i, pair) in stages.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        // Unrepresentable durations are already reported above.
        let Ok(expected) = stage_end(prev) else {
            continue;
        };
        let drift = time::hours_between(expected, next.start) - next.pause_before_hours;
        if drift.abs() > tolerance {
            errors.push(ValidationError::at_stage(
                ValidationErrorKind::NonContiguous,
                i + 1,
                format!(
                    "'{}' starts at {} but the previous stage ends at {} ({drift:+}h)",
                    next.label,
                    time::format_wire(next.start),
                    time::format_wire(expected)
                ),
            ));
        }
    }

    let total = total_hours(stages);
    if total.is_nan() || total <= 0.0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::NonPositiveTotal,
            format!("total hours must be positive, got {total}"),
        ));
    }

    if let Some(Ok(last_end)) = stages.last().map(stage_end) {
        if time::hours_between(last_end, process_end).abs() > tolerance {
            errors.push(ValidationError::new(
                ValidationErrorKind::EndMismatch,
                format!(
                    "process end {} differs from last stage end {}",
                    time::format_wire(process_end),
                    time::format_wire(last_end)
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates an expanded timeline and wraps it in a [`CompiledSchedule`].
///
/// The instance list is moved into the result as-is, without reordering.
pub fn package(
    request: &ScheduleRequest,
    plan: &ResolvedPlan<'_>,
    stages: Vec<StageInstance>,
    config: &CompilerConfig,
) -> Result<CompiledSchedule, CompileError> {
    validate_timeline(plan.kind, &stages, plan.process_end, config)
        .map_err(CompileError::Validation)?;

    Ok(CompiledSchedule {
        process_name: request.process_name.clone(),
        kind: plan.kind,
        process_end: plan.process_end,
        total_hours: total_hours(&stages),
        stage_instance_count: stages.len(),
        stages,
        creator_id: request.creator_id,
        device_id: request.device_id.clone(),
    })
}

fn total_hours(stages: &[StageInstance]) -> f64 {
    stages.iter().map(|s| s.effective_duration_hours).sum()
}

fn stage_end(stage: &StageInstance) -> Result<NaiveDateTime, CompileError> {
    time::add_hours(stage.start, stage.effective_duration_hours)
}
