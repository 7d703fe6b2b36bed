//! Stepwise Core Library
//!
//! Source-level stepping control for a debugger:
//! - Should-stop-here decision protocol with pluggable policies
//! - Step-from-here continuations that redirect a step
//! - Thread plans and the per-thread plan stack they run on
//! - JSON-RPC protocol types for stepwise-server

pub mod error;
pub mod flags;
pub mod frame;
pub mod ids;
pub mod plan;
pub mod protocol;
pub mod range;
pub mod settings;
pub mod stop_here;
pub mod symbol;
pub mod target;
pub mod thread;

pub use error::{Result, StepError};
pub use flags::{AvoidFlags, FrameComparison, LazyBool, RunMode, Vote};
pub use frame::{CallStack, FrameSnapshot, StackFrame, StackId, StopContext};
pub use ids::{PlanId, ThreadId};
pub use plan::{PlanInfo, PlanKind, PlanStep, ResumeAction, ThreadPlan};
pub use protocol::{PlanRequest, Request, Response};
pub use settings::StepSettings;
pub use stop_here::{
    DefaultStopHerePolicy, FnStopHerePolicy, ShouldStopHere, StopHereOutcome, StopHerePolicy,
};
pub use symbol::{AddressRange, LineEntry, Symbol, SymbolContext, SymbolContextScope};
pub use target::Target;
pub use thread::{StopDecision, Thread};
