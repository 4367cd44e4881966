//! Compiler configuration.
//!
//! Defaults reproduce the controller's limits. Every field can be overridden
//! from serde input (missing fields fall back to defaults) or from
//! `RPSC_*` environment variables.

use std::env;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::time;

/// Tunables for [`ScheduleCompiler`](crate::compiler::ScheduleCompiler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Allowed drift between one stage's end and the next stage's start (h).
    pub contiguity_tolerance_hours: f64,
    /// Lowest accepted humidity (%).
    pub humidity_min: f64,
    /// Highest accepted humidity (%).
    pub humidity_max: f64,
    /// Instants earlier than this are rejected. `None` = no lower bound.
    pub not_before: Option<NaiveDateTime>,
    /// Admission cap on emitted stage instances. `None` = unbounded.
    pub max_stage_instances: Option<usize>,
    /// Reject periodic requests whose single pass over the stages is longer
    /// than the hours budget. Off by default: the last stage is truncated.
    pub reject_oversized_pass: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            contiguity_tolerance_hours: 1e-9,
            humidity_min: 0.0,
            humidity_max: 100.0,
            not_before: None,
            max_stage_instances: None,
            reject_oversized_pass: false,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

impl CompilerConfig {
    /// Builds a config from environment variables over the defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `RPSC_CONTIGUITY_TOLERANCE_HOURS` | `contiguity_tolerance_hours` |
    /// | `RPSC_HUMIDITY_MIN` | `humidity_min` |
    /// | `RPSC_HUMIDITY_MAX` | `humidity_max` |
    /// | `RPSC_NOT_BEFORE` | `not_before` (`DD-MM-YYYY_HH-MM`) |
    /// | `RPSC_MAX_STAGE_INSTANCES` | `max_stage_instances` |
    /// | `RPSC_REJECT_OVERSIZED_PASS` | `reject_oversized_pass` (`true`/`false`) |
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            contiguity_tolerance_hours: env_opt("RPSC_CONTIGUITY_TOLERANCE_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.contiguity_tolerance_hours),
            humidity_min: env_opt("RPSC_HUMIDITY_MIN")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.humidity_min),
            humidity_max: env_opt("RPSC_HUMIDITY_MAX")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.humidity_max),
            not_before: env_opt("RPSC_NOT_BEFORE").and_then(|v| time::parse_wire(&v).ok()),
            max_stage_instances: env_opt("RPSC_MAX_STAGE_INSTANCES").and_then(|v| v.parse().ok()),
            reject_oversized_pass: env_opt("RPSC_REJECT_OVERSIZED_PASS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reject_oversized_pass),
        }
    }

    /// Sets the lower bound for every instant in a request.
    pub fn with_not_before(mut self, instant: NaiveDateTime) -> Self {
        self.not_before = Some(instant);
        self
    }

    /// Caps the number of emitted stage instances.
    pub fn with_max_stage_instances(mut self, max: usize) -> Self {
        self.max_stage_instances = Some(max);
        self
    }

    /// Rejects periodic requests whose stage list does not fit in one budget.
    pub fn with_oversized_pass_rejected(mut self) -> Self {
        self.reject_oversized_pass = true;
        self
    }

    /// Whether a humidity value is acceptable.
    pub fn humidity_in_range(&self, humidity_pct: f64) -> bool {
        (self.humidity_min..=self.humidity_max).contains(&humidity_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CompilerConfig::default();
        assert_eq!(cfg.contiguity_tolerance_hours, 1e-9);
        assert!(cfg.humidity_in_range(0.0));
        assert!(cfg.humidity_in_range(100.0));
        assert!(!cfg.humidity_in_range(100.5));
        assert!(!cfg.humidity_in_range(-1.0));
        assert!(!cfg.humidity_in_range(f64::NAN));
        assert!(!cfg.reject_oversized_pass);
    }

    #[test]
    fn test_deserialize_partial() {
        let cfg: CompilerConfig =
            serde_json::from_str(r#"{ "max_stage_instances": 500 }"#).unwrap();
        assert_eq!(cfg.max_stage_instances, Some(500));
        assert_eq!(cfg.humidity_max, 100.0);
        assert_eq!(cfg.not_before, None);
        assert!(!cfg.reject_oversized_pass);

        let strict: CompilerConfig =
            serde_json::from_str(r#"{ "reject_oversized_pass": true }"#).unwrap();
        assert!(strict.reject_oversized_pass);
    }

    #[test]
    fn test_from_env() {
        env::set_var("RPSC_MAX_STAGE_INSTANCES", "64");
        env::set_var("RPSC_NOT_BEFORE", "01-01-2025_00-00");
        env::set_var("RPSC_HUMIDITY_MAX", "not-a-number");
        env::set_var("RPSC_REJECT_OVERSIZED_PASS", "true");
        let cfg = CompilerConfig::from_env();
        env::remove_var("RPSC_REJECT_OVERSIZED_PASS");
        env::remove_var("RPSC_MAX_STAGE_INSTANCES");
        env::remove_var("RPSC_NOT_BEFORE");
        env::remove_var("RPSC_HUMIDITY_MAX");

        assert_eq!(cfg.max_stage_instances, Some(64));
        assert_eq!(cfg.not_before, time::parse_wire("01-01-2025_00-00").ok());
        assert_eq!(cfg.humidity_max, 100.0);
        assert!(cfg.reject_oversized_pass);
    }
}
