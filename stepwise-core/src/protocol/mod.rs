//! JSON-RPC Protocol definitions
//!
//! Defines the line-oriented protocol between a debugger host and
//! stepwise-server. The host reports stops and stack snapshots; the server
//! answers with stepping decisions.

use serde::{Deserialize, Serialize};

use crate::flags::{FrameComparison, RunMode};
use crate::frame::FrameSnapshot;
use crate::ids::{PlanId, ThreadId};
use crate::plan::PlanInfo;
use crate::settings::StepSettings;
use crate::symbol::AddressRange;
use crate::thread::StopDecision;

/// A stepping operation the user asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanRequest {
    StepIn {
        range: AddressRange,
        #[serde(default)]
        run_mode: RunMode,
    },
    StepOver {
        range: AddressRange,
        #[serde(default)]
        run_mode: RunMode,
    },
    StepOut {
        #[serde(default)]
        frame_index: usize,
        #[serde(default)]
        stop_others: bool,
    },
    RunTo {
        addresses: Vec<u64>,
        #[serde(default)]
        stop_others: bool,
    },
}

/// Request from the debugger host to stepwise-server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Request {
    /// Apply step settings; threads added afterwards pick them up
    #[serde(rename = "initialize")]
    Initialize {
        #[serde(default)]
        settings: Option<StepSettings>,
    },

    #[serde(rename = "add_thread")]
    AddThread { thread: ThreadId },

    /// Replace a thread's call stack without evaluating plans
    #[serde(rename = "update_stack")]
    UpdateStack {
        thread: ThreadId,
        frames: Vec<FrameSnapshot>,
    },

    #[serde(rename = "queue_plan")]
    QueuePlan { thread: ThreadId, plan: PlanRequest },

    /// The thread stopped at `frames`; decide whether to report it
    #[serde(rename = "stop")]
    Stop {
        thread: ThreadId,
        frames: Vec<FrameSnapshot>,
    },

    /// Run the stop-here check alone, without touching the plan stack
    #[serde(rename = "should_stop_here")]
    ShouldStopHere {
        thread: ThreadId,
        comparison: FrameComparison,
    },

    #[serde(rename = "plans")]
    Plans { thread: ThreadId },

    #[serde(rename = "discard_plan")]
    DiscardPlan { thread: ThreadId, plan: PlanId },

    /// Shutdown the server
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Response from stepwise-server to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Decision {
        decision: StopDecision,
        plans: Vec<PlanInfo>,
    },
    ShouldStopHere {
        stop: bool,
        redirect: Option<PlanInfo>,
    },
    Queued { plan: PlanId },
    Plans { plans: Vec<PlanInfo> },
    Success { ok: bool },
    Error { error: String },
}

impl Response {
    pub fn success() -> Self {
        Response::Success { ok: true }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error { error: msg.into() }
    }

    pub fn decision(decision: StopDecision, plans: Vec<PlanInfo>) -> Self {
        Response::Decision { decision, plans }
    }

    pub fn should_stop_here(stop: bool, redirect: Option<PlanInfo>) -> Self {
        Response::ShouldStopHere { stop, redirect }
    }
}

/// JSON-RPC message wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcMessage<T> {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(flatten)]
    pub content: T,
}

impl<T> RpcMessage<T> {
    pub fn new(id: u64, content: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            content,
        }
    }
}
