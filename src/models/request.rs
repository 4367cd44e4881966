//! Schedule request (compiler input) and recurrence policy.
//!
//! A request is created once per operator submission, consumed exactly once
//! by the compiler, and never mutated after compilation begins.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::StageTemplate;

/// How stage templates repeat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RecurrencePolicy {
    /// Stages carry explicit start instants; no repetition.
    Single {
        /// Explicit end of the whole process.
        process_end: NaiveDateTime,
    },
    /// The template list repeats exactly `cycle_count` times.
    Cyclic {
        /// Number of cycles (≥ 1).
        cycle_count: u32,
        /// Idle time between consecutive cycles (h, ≥ 0). Not part of the budget.
        pause_hours: f64,
    },
    /// The template list repeats until `total_hours` is exhausted.
    Periodic {
        /// Total-hours budget (> 0).
        total_hours: f64,
    },
}

/// Recurrence mode with its fixed wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecurrenceKind {
    /// Run once (code 0).
    Single,
    /// Fixed number of cycles (code 1).
    Cyclic,
    /// Repeat until an hours budget is spent (code 2).
    Periodic,
}

impl RecurrencePolicy {
    /// Single run ending at `process_end`.
    pub fn single(process_end: NaiveDateTime) -> Self {
        Self::Single { process_end }
    }

    /// `cycle_count` back-to-back cycles.
    pub fn cyclic(cycle_count: u32) -> Self {
        Self::Cyclic {
            cycle_count,
            pause_hours: 0.0,
        }
    }

    /// `cycle_count` cycles separated by `pause_hours` of idle time.
    pub fn cyclic_with_pause(cycle_count: u32, pause_hours: f64) -> Self {
        Self::Cyclic {
            cycle_count,
            pause_hours,
        }
    }

    /// Repeat until `total_hours` is exhausted.
    pub fn periodic(total_hours: f64) -> Self {
        Self::Periodic { total_hours }
    }

    /// The recurrence mode.
    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Self::Single { .. } => RecurrenceKind::Single,
            Self::Cyclic { .. } => RecurrenceKind::Cyclic,
            Self::Periodic { .. } => RecurrenceKind::Periodic,
        }
    }
}

impl RecurrenceKind {
    /// Numeric code carried in the controller record.
    pub fn code(self) -> u8 {
        match self {
            Self::Single => 0,
            Self::Cyclic => 1,
            Self::Periodic => 2,
        }
    }

    /// Minimum number of stage templates (and instances) for this mode.
    pub fn min_stages(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Cyclic | Self::Periodic => 2,
        }
    }

    /// Repetition marker appended to stage labels, if any.
    pub fn label_marker(self) -> Option<&'static str> {
        match self {
            Self::Single => None,
            Self::Cyclic => Some("Ciclo"),
            Self::Periodic => Some("Repetición"),
        }
    }
}

/// Compiler input: one operator submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Process name.
    pub process_name: String,
    /// Process start instant. Single-run processes start at their first
    /// stage instead, when it has one.
    pub start: NaiveDateTime,
    /// Recurrence policy.
    pub policy: RecurrencePolicy,
    /// Stage templates, in execution order.
    pub stages: Vec<StageTemplate>,
    /// ID of the submitting user.
    pub creator_id: i64,
    /// Target controller identifier (IMEI).
    pub device_id: String,
}

impl ScheduleRequest {
    /// Creates a request with no stages.
    pub fn new(
        process_name: impl Into<String>,
        start: NaiveDateTime,
        policy: RecurrencePolicy,
    ) -> Self {
        Self {
            process_name: process_name.into(),
            start,
            policy,
            stages: Vec::new(),
            creator_id: 0,
            device_id: String::new(),
        }
    }

    /// Creates a single-run request starting at the first stage's instant.
    ///
    /// With no stages (or a first stage without a start instant) the start
    /// falls back to `process_end`; the resolver rejects such requests.
    pub fn single(
        process_name: impl Into<String>,
        stages: Vec<StageTemplate>,
        process_end: NaiveDateTime,
    ) -> Self {
        let start = stages
            .first()
            .and_then(StageTemplate::start)
            .unwrap_or(process_end);
        Self {
            stages,
            ..Self::new(process_name, start, RecurrencePolicy::single(process_end))
        }
    }

    /// Appends a stage template.
    pub fn with_stage(mut self, stage: StageTemplate) -> Self {
        self.stages.push(stage);
        self
    }

    /// Replaces the stage templates.
    pub fn with_stages(mut self, stages: Vec<StageTemplate>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the submitting user.
    pub fn with_creator(mut self, creator_id: i64) -> Self {
        self.creator_id = creator_id;
        self
    }

    /// Sets the target controller.
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Recurrence mode.
    pub fn kind(&self) -> RecurrenceKind {
        self.policy.kind()
    }
}
