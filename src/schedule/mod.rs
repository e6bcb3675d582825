//! Scheduling trigger binder
//!
//! Validates schedule expressions and binds them, with a declared
//! enabled/disabled state, to composed jobs.

pub mod binding;
pub mod expression;

pub use binding::{
    launcher_function_name, schedule_name, Invocation, PipelineParameterValue, ScheduleBinding,
    ScheduleBook, ScheduleDocument, ScheduleState,
};
pub use expression::{RateUnit, ScheduleExpression};
