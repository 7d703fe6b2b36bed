use crate::frame::StopContext;
use crate::ids::{PlanId, ThreadId};

use super::{PlanKind, PlanStep, ResumeAction, ThreadPlan};

/// Bottom of every plan stack: any stop that reaches it goes to the user.
#[derive(Debug)]
pub struct BasePlan {
    id: PlanId,
    thread: ThreadId,
}

impl BasePlan {
    pub fn new(thread: ThreadId) -> Self {
        Self {
            id: PlanId::fresh(),
            thread,
        }
    }
}

impl ThreadPlan for BasePlan {
    fn id(&self) -> PlanId {
        self.id
    }

    fn thread_id(&self) -> ThreadId {
        self.thread
    }

    fn kind(&self) -> PlanKind {
        PlanKind::Base
    }

    fn description(&self) -> String {
        format!("base plan for {}", self.thread)
    }

    fn stop_others(&self) -> bool {
        false
    }

    fn resume_action(&self) -> ResumeAction {
        ResumeAction::Continue
    }

    fn should_stop(&mut self, _cx: &StopContext<'_>) -> PlanStep {
        PlanStep::Complete
    }
}
