//! Compilation errors.
//!
//! Three failure families, none of which yields a partial result:
//!
//! - [`RequestError`]: malformed input caught by the recurrence resolver.
//! - [`ValidationError`]: timeline invariants violated after expansion.
//! - [`CompileError::NonTerminationRisk`]: the expander stopped making progress.
//!
//! Request and validation failures are aggregated, so a caller receives every
//! problem in one pass.

use std::fmt;

use thiserror::Error;

/// Top-level compiler error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The request was rejected before expansion.
    #[error("invalid schedule request: {}", join(.0))]
    Request(Vec<RequestError>),

    /// The expanded timeline broke one or more invariants.
    #[error("invalid timeline: {}", join(.0))]
    Validation(Vec<ValidationError>),

    /// A full pass over the stage templates added no elapsed time.
    #[error(
        "expansion made no progress after {instances} stage instances ({elapsed_hours}h elapsed)"
    )]
    NonTerminationRisk {
        /// Instances emitted before the stall.
        instances: usize,
        /// Elapsed hours at the stall.
        elapsed_hours: f64,
    },

    /// A time shift fell outside the representable calendar.
    #[error("time shift of {hours}h is out of range")]
    TimeOutOfRange {
        /// The offending shift in hours.
        hours: f64,
    },
}

impl CompileError {
    /// Request errors, if this is a request failure.
    pub fn request_errors(&self) -> &[RequestError] {
        match self {
            Self::Request(errors) => errors,
            _ => &[],
        }
    }

    /// Validation errors, if this is a timeline failure.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A malformed-request error.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestError {
    /// Error category.
    pub kind: RequestErrorKind,
    /// Offending request field (e.g. `"cycle_count"`, `"stages[2].name"`).
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of request errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// Process or stage name is blank.
    EmptyName,
    /// Fewer stage templates than the recurrence mode requires.
    TooFewStages,
    /// Cycle count below one.
    InvalidCycleCount,
    /// Total-hours budget is zero, negative, or not a number.
    NonPositiveBudget,
    /// Pause between cycles is negative or not a number.
    InvalidPause,
    /// Stage duration is zero, negative, or not a number.
    NonPositiveDuration,
    /// Process end does not come after process start.
    InvertedInstants,
    /// Stage carries a start instant where a duration is expected, or vice versa.
    TimingMismatch,
    /// A duration or budget exceeds the supported range.
    OutOfRange,
    /// One pass over the stages already exceeds the periodic budget.
    StagesExceedBudget,
    /// An instant lies before the configured lower bound.
    StartsInPast,
    /// Projected instance count exceeds the configured cap.
    TooManyInstances,
}

impl RequestError {
    pub(crate) fn new(
        kind: RequestErrorKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A timeline invariant violation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Index of the offending stage instance, if the violation is local to one.
    pub stage_index: Option<usize>,
    /// Human-readable description.
    pub message: String,
}

/// Categories of timeline violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Fewer stage instances than the recurrence mode requires.
    TooFewStages,
    /// A stage instance has zero or negative effective duration.
    NonPositiveDuration,
    /// Humidity outside the accepted range.
    HumidityOutOfRange,
    /// Temperature is not a finite number.
    InvalidTemperature,
    /// A stage does not start where the previous one ended.
    NonContiguous,
    /// Sum of effective durations is not positive.
    NonPositiveTotal,
    /// Process end differs from the end of the last stage.
    EndMismatch,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage_index: None,
            message: message.into(),
        }
    }

    pub(crate) fn at_stage(
        kind: ValidationErrorKind,
        index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            stage_index: Some(index),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage_index {
            Some(i) => write!(f, "stage {i}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
