//! Stage expander.
//!
//! Turns a [`ResolvedPlan`] into the raw, unvalidated list of
//! [`StageInstance`]s.
//!
//! # Algorithm
//!
//! **Single**: each declared stage lasts until the next stage's start; the
//! last one lasts until the process end. Labels pass through unchanged.
//!
//! **Cyclic / Periodic** share one loop:
//! 1. Walk the templates in order, emitting one instance per template at
//!    the cursor with `min(nominal, budget - elapsed)` hours.
//! 2. Advance cursor and elapsed by the effective duration.
//! 3. After each full pass, if budget remains, insert the cyclic pause
//!    (cursor only; the pause is not counted as elapsed).
//! 4. Stop as soon as elapsed reaches the budget. No zero-length instance
//!    is ever emitted for an exact landing.
//!
//! Labels get `" (Ciclo n)"` with `n = ceil(running / template_count)` in
//! cyclic mode, and `" (Repetición n)"` with `n` the pass number in
//! periodic mode.
//!
//! # Complexity
//! O(templates × passes).

use tracing::debug;

use crate::error::{CompileError, RequestError, RequestErrorKind};
use crate::models::{RecurrenceKind, StageInstance, StageTemplate};
use crate::recurrence::{ResolvedPlan, TerminationRule};
use crate::time;

/// Expands a plan into stage instances.
///
/// # Errors
/// - [`CompileError::NonTerminationRisk`] if a full pass adds no elapsed time.
/// - [`CompileError::TimeOutOfRange`] if the cursor leaves the calendar.
/// - [`CompileError::Request`] if a single-mode template has no start instant.
pub fn expand(plan: &ResolvedPlan<'_>) -> Result<Vec<StageInstance>, CompileError> {
    let instances = match plan.termination {
        TerminationRule::EndAt(end) => expand_single(plan.templates, end)?,
        TerminationRule::HoursBudget(_) => expand_recurring(plan)?,
    };
    debug!(
        kind = ?plan.kind,
        instances = instances.len(),
        "expanded stage templates"
    );
    Ok(instances)
}

fn expand_single(
    templates: &[StageTemplate],
    end: chrono::NaiveDateTime,
) -> Result<Vec<StageInstance>, CompileError> {
    let starts = templates
        .iter()
        .enumerate()
        .map(|(i, t)| {
            t.start().ok_or_else(|| {
                CompileError::Request(vec![RequestError::new(
                    RequestErrorKind::TimingMismatch,
                    format!("stages[{i}].timing"),
                    "single-run stages need a start instant, not a duration",
                )])
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(templates
        .iter()
        .enumerate()
        .map(|(i, template)| {
            let start = starts[i];
            let next = starts.get(i + 1).copied().unwrap_or(end);
            StageInstance::new(
                template.name.clone(),
                start,
                time::hours_between(start, next),
                template.temperature_c,
                template.humidity_pct,
            )
        })
        .collect())
}

fn expand_recurring(plan: &ResolvedPlan<'_>) -> Result<Vec<StageInstance>, CompileError> {
    let templates = plan.templates;
    let mut instances = Vec::new();
    if templates.is_empty() {
        return Ok(instances);
    }

    let budget = plan.budget_ticks;
    let nominal = templates
        .iter()
        .enumerate()
        .map(|(i, t)| nominal_ticks(i, t))
        .collect::<Result<Vec<_>, _>>()?;
    let pause = match plan.kind {
        RecurrenceKind::Cyclic => plan.pause_ticks.max(0),
        _ => 0,
    };

    let mut cursor = plan.start;
    let mut elapsed: i64 = 0;
    let mut repetition: usize = 1;
    let mut pending_pause: i64 = 0;

    'passes: while elapsed < budget {
        let pass_start = elapsed;

        for (template, &duration) in templates.iter().zip(&nominal) {
            if elapsed >= budget {
                break 'passes;
            }
            let effective = duration.min(budget - elapsed);
            let label = repetition_label(
                &template.name,
                plan.kind,
                instances.len() + 1,
                templates.len(),
                repetition,
            );

            instances.push(
                StageInstance::new(
                    label,
                    cursor,
                    time::ticks_to_hours(effective),
                    template.temperature_c,
                    template.humidity_pct,
                )
                .with_pause_before(time::ticks_to_hours(pending_pause)),
            );
            pending_pause = 0;

            cursor = time::add_ticks(cursor, effective)?;
            elapsed += effective;
        }

        if elapsed <= pass_start {
            return Err(CompileError::NonTerminationRisk {
                instances: instances.len(),
                elapsed_hours: time::ticks_to_hours(elapsed),
            });
        }

        if pause > 0 && elapsed < budget {
            cursor = time::add_ticks(cursor, pause)?;
            pending_pause = pause;
        }
        repetition += 1;
    }

    Ok(instances)
}

fn nominal_ticks(index: usize, template: &StageTemplate) -> Result<i64, CompileError> {
    let hours = template.duration_hours().ok_or_else(|| {
        CompileError::Request(vec![RequestError::new(
            RequestErrorKind::TimingMismatch,
            format!("stages[{index}].timing"),
            "recurring stages need a duration, not a start instant",
        )])
    })?;
    time::hours_to_ticks(hours).ok_or(CompileError::TimeOutOfRange { hours })
}

/// Label for the `running`-th emitted instance (1-based).
fn repetition_label(
    name: &str,
    kind: RecurrenceKind,
    running: usize,
    template_count: usize,
    repetition: usize,
) -> String {
    let n = match kind {
        RecurrenceKind::Single => return name.to_string(),
        RecurrenceKind::Cyclic => running.div_ceil(template_count),
        RecurrenceKind::Periodic => repetition,
    };
    match kind.label_marker() {
        Some(marker) => format!("{name} ({marker} {n})"),
        None => name.to_string(),
    }
}
