//! Schedule compiler facade.
//!
//! Runs the three stages strictly in order, with no branching back:
//!
//! 1. [`recurrence::resolve`]: request → plan
//! 2. [`expansion::expand`]: plan → raw stage instances
//! 3. [`validation::package`]: instances → [`CompiledSchedule`]
//!
//! The compiler holds only immutable configuration. It is `Send + Sync`
//! and can serve concurrent submissions without coordination.

use tracing::{info, warn};

use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::models::{CompiledSchedule, ScheduleRequest};
use crate::{expansion, recurrence, validation};

/// Recurring process schedule compiler.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_control_schedule::compiler::ScheduleCompiler;
/// use u_control_schedule::models::{RecurrencePolicy, ScheduleRequest, StageTemplate};
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let request = ScheduleRequest::new("Maduración", start, RecurrencePolicy::periodic(48.0))
///     .with_stage(StageTemplate::lasting("Frío", 4.0, 2.0).with_humidity(90.0))
///     .with_stage(StageTemplate::lasting("Templado", 4.0, 8.0).with_humidity(85.0))
///     .with_creator(42);
///
/// let schedule = ScheduleCompiler::new().compile(&request).unwrap();
/// assert_eq!(schedule.stage_instance_count, 12);
/// assert_eq!(schedule.to_record().process_end_instant, "12-01-2025_08-00");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScheduleCompiler {
    config: CompilerConfig,
}

impl ScheduleCompiler {
    /// Creates a compiler with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compiler with the given configuration.
    pub fn with_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles a request into a validated schedule.
    ///
    /// # Errors
    /// - [`CompileError::Request`]: malformed request (every problem listed).
    /// - [`CompileError::Validation`]: timeline invariants broken (every problem listed).
    /// - [`CompileError::NonTerminationRisk`]: expansion stopped making progress.
    /// - [`CompileError::TimeOutOfRange`]: an instant left the representable calendar.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(process = %request.process_name, kind = ?request.kind())
    )]
    pub fn compile(&self, request: &ScheduleRequest) -> Result<CompiledSchedule, CompileError> {
        let result = self.run(request);
        match &result {
            Ok(schedule) => info!(
                instances = schedule.stage_instance_count,
                total_hours = schedule.total_hours,
                "compiled schedule"
            ),
            Err(err) => warn!(error = %err, "schedule rejected"),
        }
        result
    }

    fn run(&self, request: &ScheduleRequest) -> Result<CompiledSchedule, CompileError> {
        let plan = recurrence::resolve(request, &self.config)?;
        let stages = expansion::expand(&plan)?;
        validation::package(request, &plan, stages, &self.config)
    }
}

/// Compiles a request with the default configuration.
pub fn compile(request: &ScheduleRequest) -> Result<CompiledSchedule, CompileError> {
    ScheduleCompiler::new().compile(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RequestErrorKind, ValidationErrorKind};
    use crate::models::{RecurrenceKind, RecurrencePolicy, StageTemplate};
    use crate::time;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn stage(name: &str, hours: f64, humidity: f64) -> StageTemplate {
        StageTemplate::lasting(name, hours, 4.0).with_humidity(humidity)
    }

    #[test]
    fn test_periodic_example() {
        let req = ScheduleRequest::new("P", at(1, 0, 0), RecurrencePolicy::periodic(48.0))
            .with_stages(vec![stage("A", 4.0, 80.0), stage("B", 4.0, 80.0)]);
        let s = compile(&req).unwrap();

        assert_eq!(s.kind, RecurrenceKind::Periodic);
        assert_eq!(s.stage_instance_count, 12);
        assert_eq!(s.total_hours, 48.0);
        assert!(s.stages.iter().all(|i| i.effective_duration_hours == 4.0));
        assert_eq!(s.process_end, at(3, 0, 0));
        assert_eq!(s.to_record().recurrence_kind, 2);
    }

    #[test]
    fn test_cyclic_example() {
        let req = ScheduleRequest::new("C", at(1, 6, 0), RecurrencePolicy::cyclic(5))
            .with_stages(vec![
                stage("A", 1.0, 70.0),
                stage("B", 2.0, 75.0),
                stage("C", 0.5, 80.0),
            ]);
        let s = compile(&req).unwrap();

        assert_eq!(s.stage_instance_count, 15);
        assert_eq!(s.stages[3].label, "A (Ciclo 2)");
        assert_eq!(s.total_hours, 17.5);
        assert_eq!(s.process_end, at(1, 23, 30));
        assert_eq!(s.to_record().recurrence_kind, 1);
    }

    #[test]
    fn test_cyclic_minutes_with_pause() {
        let policy = RecurrencePolicy::cyclic_with_pause(3, 0.25);
        let req = ScheduleRequest::new("C", at(1, 0, 0), policy).with_stages(vec![
                StageTemplate::lasting_minutes("A", 45.0, 2.0).with_humidity(90.0),
                StageTemplate::lasting_minutes("B", 15.0, 6.0).with_humidity(90.0),
            ]);
        let s = compile(&req).unwrap();

        assert_eq!(s.stage_instance_count, 6);
        assert_eq!(s.total_hours, 3.0);
        assert_eq!(s.total_pause_hours(), 0.5);
        assert_eq!(s.process_end, at(1, 3, 30));
        let record = s.to_record();
        assert_eq!(record.stages[2].start_instant, "01-02-2025_01-15");
        assert_eq!(record.process_end_instant, "01-02-2025_03-30");
    }

    #[test]
    fn test_single_example() {
        let req = ScheduleRequest::single(
            "Único",
            vec![
                StageTemplate::starting_at("Carga", at(1, 8, 0), 12.0),
                StageTemplate::starting_at("Frío", at(1, 10, 15), 1.0).with_humidity(92.0),
            ],
            at(2, 8, 0),
        )
        .with_creator(5);
        let s = compile(&req).unwrap();

        assert_eq!(s.stage_instance_count, 2);
        assert_eq!(s.stages[0].label, "Carga");
        assert_eq!(s.stages[0].effective_duration_hours, 2.25);
        assert_eq!(s.total_hours, 24.0);
        let record = s.to_record();
        assert_eq!(record.recurrence_kind, 0);
        assert_eq!(record.process_end_instant, "02-02-2025_08-00");
        assert_eq!(record.creator_id, 5);
    }

    #[test]
    fn test_single_out_of_order_rejected_by_validator() {
        let req = ScheduleRequest::single(
            "Único",
            vec![
                StageTemplate::starting_at("A", at(1, 8, 0), 1.0),
                StageTemplate::starting_at("B", at(1, 7, 0), 1.0),
            ],
            at(1, 12, 0),
        );
        let err = compile(&req).unwrap_err();
        let kinds: Vec<_> = err.validation_errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ValidationErrorKind::NonPositiveDuration]);
    }

    #[test]
    fn test_humidity_rejected() {
        for bad in [101.0, -1.0] {
            let req = ScheduleRequest::new("P", at(1, 0, 0), RecurrencePolicy::periodic(8.0))
                .with_stages(vec![stage("A", 4.0, 50.0), stage("B", 4.0, bad)]);
            let err = compile(&req).unwrap_err();
            assert!(err
                .validation_errors()
                .iter()
                .all(|e| e.kind == ValidationErrorKind::HumidityOutOfRange));
            assert_eq!(err.validation_errors().len(), 1);
        }
    }

    #[test]
    fn test_request_errors_surface() {
        let req = ScheduleRequest::new("P", at(1, 0, 0), RecurrencePolicy::periodic(8.0))
            .with_stage(stage("A", 4.0, 50.0));
        let err = compile(&req).unwrap_err();
        assert_eq!(err.request_errors()[0].kind, RequestErrorKind::TooFewStages);
    }

    #[test]
    fn test_idempotent() {
        let policy = RecurrencePolicy::cyclic_with_pause(4, 1.0);
        let req = ScheduleRequest::new("C", at(1, 0, 0), policy)
            .with_stages(vec![stage("A", 1.3, 70.0), stage("B", 2.7, 75.0)])
            .with_device("868428046606400");
        let compiler = ScheduleCompiler::new();
        assert_eq!(compiler.compile(&req).unwrap(), compiler.compile(&req).unwrap());
    }

    #[test]
    fn test_budget_conservation_and_contiguity() {
        let policy = RecurrencePolicy::cyclic_with_pause(7, 0.1);
        let req = ScheduleRequest::new("C", at(1, 0, 0), policy).with_stages(vec![
            stage("A", 0.1, 70.0),
            stage("B", 0.2, 75.0),
            stage("C", 1.0 / 3.0, 75.0),
        ]);
        let s = compile(&req).unwrap();

        let budget = (0.1 + 0.2 + 1.0 / 3.0) * 7.0;
        assert!((s.total_hours - budget).abs() < 1e-9);
        for pair in s.stages.windows(2) {
            let end = time::add_hours(pair[0].start, pair[0].effective_duration_hours).unwrap();
            let gap = time::hours_between(end, pair[1].start);
            assert!((gap - pair[1].pause_before_hours).abs() < 1e-9);
        }
    }

    #[test]
    fn test_config_cap_applies() {
        let config = CompilerConfig::default().with_max_stage_instances(4);
        let compiler = ScheduleCompiler::with_config(config);
        let req = ScheduleRequest::new("P", at(1, 0, 0), RecurrencePolicy::periodic(48.0))
            .with_stages(vec![stage("A", 4.0, 80.0), stage("B", 4.0, 80.0)]);
        let err = compiler.compile(&req).unwrap_err();
        assert_eq!(err.request_errors()[0].kind, RequestErrorKind::TooManyInstances);
        assert_eq!(compiler.config().max_stage_instances, Some(4));
    }

    #[test]
    fn test_periodic_truncates_last_stage() {
        let req = ScheduleRequest::new("P", at(1, 0, 0), RecurrencePolicy::periodic(6.0))
            .with_stages(vec![stage("A", 4.0, 80.0), stage("B", 4.0, 80.0)]);
        let s = compile(&req).unwrap();

        assert_eq!(s.stage_instance_count, 2);
        assert_eq!(s.stages[0].effective_duration_hours, 4.0);
        assert_eq!(s.stages[1].effective_duration_hours, 2.0);
        assert_eq!(s.stages[1].label, "B (Repetición 1)");
        assert_eq!(s.total_hours, 6.0);
        assert_eq!(s.process_end, at(1, 6, 0));

        let strict = CompilerConfig::default().with_oversized_pass_rejected();
        let err = ScheduleCompiler::with_config(strict).compile(&req).unwrap_err();
        assert_eq!(err.request_errors()[0].kind, RequestErrorKind::StagesExceedBudget);
    }

    #[test]
    fn test_sub_tick_duration_rejected() {
        let req = ScheduleRequest::new("C", at(1, 0, 0), RecurrencePolicy::cyclic(1))
            .with_stages(vec![stage("A", 1e-11, 80.0), stage("B", 1.0, 80.0)]);
        let err = compile(&req).unwrap_err();
        let errors = err.request_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, RequestErrorKind::NonPositiveDuration);
        assert_eq!(errors[0].field, "stages[0].duration_hours");
    }

    #[test]
    fn test_long_cyclic_process() {
        let req = ScheduleRequest::new("C", at(1, 0, 0), RecurrencePolicy::cyclic(500))
            .with_stages(vec![stage("A", 1000.0, 80.0), stage("B", 1000.0, 80.0)]);
        let s = compile(&req).unwrap();

        assert_eq!(s.stage_instance_count, 1000);
        assert_eq!(s.total_hours, 1_000_000.0);
        assert_eq!(s.stages[999].label, "B (Ciclo 500)");
        let start = s.start().unwrap();
        assert_eq!(time::hours_between(start, s.process_end), 1_000_000.0);
    }

    #[test]
    fn test_periodic_budget_out_of_range() {
        let req = ScheduleRequest::new("P", at(1, 0, 0), RecurrencePolicy::periodic(900_000.0))
            .with_stages(vec![stage("A", 4.0, 80.0), stage("B", 4.0, 80.0)]);
        let err = compile(&req).unwrap_err();
        assert_eq!(err.request_errors()[0].kind, RequestErrorKind::OutOfRange);
        assert_eq!(err.request_errors()[0].field, "total_hours");
    }

    #[test]
    fn test_single_start_follows_first_stage() {
        let req = ScheduleRequest::new("S", at(1, 0, 0), RecurrencePolicy::single(at(1, 12, 0)))
            .with_stage(StageTemplate::starting_at("A", at(1, 2, 0), 2.0));
        let s = compile(&req).unwrap();

        assert_eq!(s.start(), Some(at(1, 2, 0)));
        assert_eq!(s.total_hours, 10.0);
    }

    #[test]
    fn test_compiler_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScheduleCompiler>();
    }
}
