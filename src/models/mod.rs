//! Schedule compilation domain models.
//!
//! Input ([`ScheduleRequest`] with its [`StageTemplate`]s and
//! [`RecurrencePolicy`]) and output ([`CompiledSchedule`] of
//! [`StageInstance`]s, flattened to a [`ScheduleRecord`] for the controller).
//!
//! # Domain Mappings
//!
//! | u-control-schedule | Reefer container | Ripening room |
//! |--------------------|------------------|---------------|
//! | StageTemplate | Set-point step | Ripening phase |
//! | RecurrencePolicy | Control type | Program mode |
//! | StageInstance | Scheduled step | Timed phase |
//! | CompiledSchedule | Controller program | Room program |

mod request;
mod schedule;
mod stage;

pub use request::{RecurrenceKind, RecurrencePolicy, ScheduleRequest};
pub use schedule::{CompiledSchedule, ScheduleRecord, StageRecord};
pub use stage::{StageInstance, StageTemplate, StageTiming};
