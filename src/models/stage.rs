//! Stage templates and stage instances.
//!
//! A **stage template** is a user-declared set-point (temperature, optional
//! humidity) together with its timing: an explicit start instant in single
//! mode, or a nominal duration in cyclic/periodic mode. A **stage instance**
//! is one concrete, absolutely-timestamped occurrence of a template in the
//! compiled timeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A control set-point declared by the operator.
///
/// Immutable once submitted; the compiler only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTemplate {
    /// Stage name shown on the controller display.
    pub name: String,
    /// Target temperature (°C).
    pub temperature_c: f64,
    /// Target relative humidity (%). `None` = humidity not controlled.
    pub humidity_pct: Option<f64>,
    /// When the stage starts or how long it lasts.
    pub timing: StageTiming,
}

/// Timing of a stage template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StageTiming {
    /// Explicit start instant (single mode).
    StartsAt(NaiveDateTime),
    /// Nominal duration in hours (cyclic and periodic modes).
    Lasts {
        /// Nominal duration (h).
        hours: f64,
    },
}

impl StageTemplate {
    /// Creates a template with an explicit start instant.
    pub fn starting_at(name: impl Into<String>, start: NaiveDateTime, temperature_c: f64) -> Self {
        Self {
            name: name.into(),
            temperature_c,
            humidity_pct: None,
            timing: StageTiming::StartsAt(start),
        }
    }

    /// Creates a template with a nominal duration in hours.
    pub fn lasting(name: impl Into<String>, hours: f64, temperature_c: f64) -> Self {
        Self {
            name: name.into(),
            temperature_c,
            humidity_pct: None,
            timing: StageTiming::Lasts { hours },
        }
    }

    /// Creates a template with a nominal duration in minutes.
    ///
    /// Cyclic processes are usually entered in minutes at the form layer.
    pub fn lasting_minutes(name: impl Into<String>, minutes: f64, temperature_c: f64) -> Self {
        Self::lasting(name, minutes / 60.0, temperature_c)
    }

    /// Sets the target humidity.
    pub fn with_humidity(mut self, humidity_pct: f64) -> Self {
        self.humidity_pct = Some(humidity_pct);
        self
    }

    /// Explicit start instant, if any.
    pub fn start(&self) -> Option<NaiveDateTime> {
        match self.timing {
            StageTiming::StartsAt(t) => Some(t),
            StageTiming::Lasts { .. } => None,
        }
    }

    /// Nominal duration in hours, if any.
    pub fn duration_hours(&self) -> Option<f64> {
        match self.timing {
            StageTiming::Lasts { hours } => Some(hours),
            StageTiming::StartsAt(_) => None,
        }
    }
}

/// One emitted row of the compiled timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInstance {
    /// Template name, with a repetition marker in cyclic/periodic mode.
    pub label: String,
    /// Absolute start instant.
    pub start: NaiveDateTime,
    /// Effective duration (h). Below the nominal duration only when truncated.
    pub effective_duration_hours: f64,
    /// Target temperature (°C).
    pub temperature_c: f64,
    /// Target relative humidity (%).
    pub humidity_pct: Option<f64>,
    /// Pause inserted between the previous instance's end and this start (h).
    pub pause_before_hours: f64,
}

impl StageInstance {
    /// Creates an instance with no preceding pause.
    pub fn new(
        label: impl Into<String>,
        start: NaiveDateTime,
        effective_duration_hours: f64,
        temperature_c: f64,
        humidity_pct: Option<f64>,
    ) -> Self {
        Self {
            label: label.into(),
            start,
            effective_duration_hours,
            temperature_c,
            humidity_pct,
            pause_before_hours: 0.0,
        }
    }

    /// Sets the pause that precedes this instance.
    pub fn with_pause_before(mut self, hours: f64) -> Self {
        self.pause_before_hours = hours;
        self
    }
}
