//! Thread plans
//!
//! A thread carries a stack of plans. After every low-level stop the plan
//! on top is asked whether it is done; it may instead layer a new plan on
//! top of itself, which is how the should-stop-here continuation takes
//! effect.

mod base;
mod run_to;
mod stack;
mod step_out;
mod step_range;

pub use base::BasePlan;
pub use run_to::RunToAddressPlan;
pub use stack::{PlanEntry, PlanInfo, PlanStack};
pub use step_out::StepOutPlan;
pub use step_range::{StepFlavor, StepRangePlan};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flags::Vote;
use crate::frame::StopContext;
use crate::ids::{PlanId, ThreadId};
use crate::stop_here::ShouldStopHere;
use crate::symbol::AddressRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Base,
    StepInRange,
    StepOverRange,
    StepOut,
    RunToAddress,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanKind::Base => "base",
            PlanKind::StepInRange => "step-in-range",
            PlanKind::StepOverRange => "step-over-range",
            PlanKind::StepOut => "step-out",
            PlanKind::RunToAddress => "run-to-address",
        };
        f.write_str(name)
    }
}

/// How the inferior should be resumed for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeAction {
    SingleStep,
    Continue,
}

/// A plan's verdict on the current stop
#[derive(Debug)]
pub enum PlanStep {
    /// Not done yet; resume with the plan's action
    Running,
    /// Done; pop it
    Complete,
    /// Layer this plan on top and resume with it
    Push(Box<dyn ThreadPlan>),
}

pub trait ThreadPlan: Send + fmt::Debug {
    fn id(&self) -> PlanId;

    fn thread_id(&self) -> ThreadId;

    fn kind(&self) -> PlanKind;

    fn description(&self) -> String;

    /// Hold other threads while this plan resumes the inferior
    fn stop_others(&self) -> bool;

    fn resume_action(&self) -> ResumeAction;

    /// Evaluate the current stop
    fn should_stop(&mut self, cx: &StopContext<'_>) -> PlanStep;

    fn stop_vote(&self) -> Vote {
        Vote::NoOpinion
    }

    fn run_vote(&self) -> Vote {
        Vote::NoOpinion
    }

    /// Address ranges this plan steps through, if any
    fn ranges(&self) -> Vec<AddressRange> {
        Vec::new()
    }

    /// Called once the plan has been pushed onto its thread's stack
    fn did_push(&mut self, _cx: &StopContext<'_>) {}

    fn stop_here(&self) -> Option<&ShouldStopHere> {
        None
    }

    fn stop_here_mut(&mut self) -> Option<&mut ShouldStopHere> {
        None
    }
}
