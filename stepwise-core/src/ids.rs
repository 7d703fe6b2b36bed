//! Identifier types for threads and plans.
//!
//! Plans refer to their thread, and the plan stack refers to its plans, by
//! these lightweight Copy newtypes rather than by reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of an inferior thread, as assigned by the debugger host.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ThreadId(pub u64);

/// Unique identifier of a thread plan.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct PlanId(pub u64);

static PLAN_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl PlanId {
    /// Create a fresh unique PlanId.
    pub fn fresh() -> Self {
        PlanId(PLAN_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid {}", self.0)
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan #{}", self.0)
    }
}
