//! Recurring process schedule compiler for refrigerated container controllers.
//!
//! Turns a handful of operator-declared stage templates (a temperature and
//! humidity set-point held for a duration) plus a recurrence policy into a
//! strictly ordered, non-overlapping timeline of absolute-time stage
//! instances, ready to be sent to a remote controller.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `StageTemplate`, `RecurrencePolicy`,
//!   `ScheduleRequest`, `StageInstance`, `CompiledSchedule`, `ScheduleRecord`
//! - **`recurrence`**: Resolves a request into a start, a termination rule,
//!   and the ordered templates
//! - **`expansion`**: Expands templates into stage instances, truncating at
//!   the budget boundary
//! - **`validation`**: Timeline invariant checks and packaging
//! - **`compiler`**: `ScheduleCompiler`, the three stages end to end
//! - **`time`**: Tick arithmetic and the controller's timestamp format
//!
//! # Recurrence Modes
//!
//! | Mode | Code | Termination | Label marker |
//! |------|------|-------------|--------------|
//! | Single | 0 | explicit end instant | none |
//! | Cyclic | 1 | Σ durations × cycles | `(Ciclo n)` |
//! | Periodic | 2 | total-hours budget | `(Repetición n)` |
//!
//! The compiler is pure and synchronous: no I/O, no shared state. It either
//! returns a fully valid [`CompiledSchedule`](models::CompiledSchedule) or an
//! error listing every problem found.

pub mod compiler;
pub mod config;
pub mod error;
pub mod expansion;
pub mod models;
pub mod recurrence;
pub mod time;
pub mod validation;

pub use compiler::{compile, ScheduleCompiler};
pub use config::CompilerConfig;
pub use error::CompileError;
