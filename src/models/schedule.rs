//! Compiled schedule (compiler output) and its controller record.
//!
//! A [`CompiledSchedule`] is the validated timeline. [`ScheduleRecord`] is
//! the flat shape handed to the transport layer; its field names and
//! timestamp format are what the controller firmware reads.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{RecurrenceKind, StageInstance};
use crate::time;

/// A validated, chronologically ordered timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledSchedule {
    /// Process name.
    pub process_name: String,
    /// Recurrence mode the timeline was compiled under.
    pub kind: RecurrenceKind,
    /// Stage instances in start order. Never empty.
    pub stages: Vec<StageInstance>,
    /// End of the whole process (end of the last instance).
    pub process_end: NaiveDateTime,
    /// Sum of effective durations (h). Cyclic pauses are not included.
    pub total_hours: f64,
    /// Number of stage instances.
    pub stage_instance_count: usize,
    /// ID of the submitting user.
    pub creator_id: i64,
    /// Target controller identifier.
    pub device_id: String,
}

/// Flat controller record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub process_name: String,
    /// `DD-MM-YYYY_HH-MM`.
    pub process_end_instant: String,
    pub total_hours: f64,
    /// 0 = single, 1 = cyclic, 2 = periodic.
    pub recurrence_kind: u8,
    pub stage_instance_count: usize,
    pub stages: Vec<StageRecord>,
    pub creator_id: i64,
    pub device_id: String,
}

/// One stage row of a [`ScheduleRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub name: String,
    /// `DD-MM-YYYY_HH-MM`.
    pub start_instant: String,
    pub duration_hours: f64,
    pub temperature_c: f64,
    pub humidity_pct: Option<f64>,
}

impl CompiledSchedule {
    /// Start of the first stage instance.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.stages.first().map(|s| s.start)
    }

    /// Sum of cyclic pauses (h).
    pub fn total_pause_hours(&self) -> f64 {
        self.stages.iter().map(|s| s.pause_before_hours).sum()
    }

    /// Instances whose label starts with the given template name.
    pub fn stages_for_template(&self, name: &str) -> Vec<&StageInstance> {
        self.stages
            .iter()
            .filter(|s| {
                s.label == name
                    || s
                        .label
                        .strip_prefix(name)
                        .is_some_and(|rest| rest.starts_with(" ("))
            })
            .collect()
    }

    /// Flattens the schedule into the controller record.
    pub fn to_record(&self) -> ScheduleRecord {
        ScheduleRecord {
            process_name: self.process_name.clone(),
            process_end_instant: time::format_wire(self.process_end),
            total_hours: self.total_hours,
            recurrence_kind: self.kind.code(),
            stage_instance_count: self.stage_instance_count,
            stages: self
                .stages
                .iter()
                .map(|s| StageRecord {
                    name: s.label.clone(),
                    start_instant: time::format_wire(s.start),
                    duration_hours: s.effective_duration_hours,
                    temperature_c: s.temperature_c,
                    humidity_pct: s.humidity_pct,
                })
                .collect(),
            creator_id: self.creator_id,
            device_id: self.device_id.clone(),
        }
    }
}
