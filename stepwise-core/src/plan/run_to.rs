use crate::frame::StopContext;
use crate::ids::{PlanId, ThreadId};

use super::{PlanKind, PlanStep, ResumeAction, ThreadPlan};

/// Run until the pc reaches one of a set of addresses
#[derive(Debug)]
pub struct RunToAddressPlan {
    id: PlanId,
    thread: ThreadId,
    addresses: Vec<u64>,
    stop_others: bool,
}

impl RunToAddressPlan {
    pub fn new(thread: ThreadId, addresses: Vec<u64>, stop_others: bool) -> Self {
        Self {
            id: PlanId::fresh(),
            thread,
            addresses,
            stop_others,
        }
    }
}

impl ThreadPlan for RunToAddressPlan {
    fn id(&self) -> PlanId {
        self.id
    }

    fn thread_id(&self) -> ThreadId {
        self.thread
    }

    fn kind(&self) -> PlanKind {
        PlanKind::RunToAddress
    }

    fn description(&self) -> String {
        let targets: Vec<String> = self.addresses.iter().map(|a| format!("0x{:x}", a)).collect();
        format!("run to address: {}", targets.join(", "))
    }

    fn stop_others(&self) -> bool {
        self.stop_others
    }

    fn resume_action(&self) -> ResumeAction {
        ResumeAction::Continue
    }

    fn should_stop(&mut self, cx: &StopContext<'_>) -> PlanStep {
        match cx.pc() {
            Some(pc) if self.addresses.contains(&pc) => PlanStep::Complete,
            Some(_) => PlanStep::Running,
            None => PlanStep::Complete,
        }
    }
}
