//! Error types for plan-stack and settings operations
//!
//! The stop-here decision itself never fails; every error here comes from
//! queueing, discarding or configuring plans.

use thiserror::Error;

use crate::ids::{PlanId, ThreadId};

#[derive(Error, Debug)]
pub enum StepError {
    #[error("Unknown thread: {0}")]
    UnknownThread(ThreadId),

    #[error("{0} is already handling a request")]
    ThreadBusy(ThreadId),

    #[error("Unknown plan {plan} on {thread}")]
    UnknownPlan { thread: ThreadId, plan: PlanId },

    #[error("The base plan of {0} cannot be discarded")]
    BasePlan(ThreadId),

    #[error("{thread} has no frame at index {index}")]
    NoFrame { thread: ThreadId, index: usize },

    #[error("{0} does not consult a stop-here policy")]
    NoStopHerePolicy(PlanId),

    #[error("Invalid address range: end 0x{end:x} precedes start 0x{start:x}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),
}

impl StepError {
    pub fn unknown_plan(thread: ThreadId, plan: PlanId) -> Self {
        StepError::UnknownPlan { thread, plan }
    }

    pub fn no_frame(thread: ThreadId, index: usize) -> Self {
        StepError::NoFrame { thread, index }
    }
}

pub type Result<T> = std::result::Result<T, StepError>;
