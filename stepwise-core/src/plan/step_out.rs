use crate::flags::{FrameComparison, LazyBool, Vote};
use crate::frame::{FrameOrigin, StopContext};
use crate::ids::{PlanId, ThreadId};
use crate::stop_here::ShouldStopHere;

use super::{PlanKind, PlanStep, ResumeAction, ThreadPlan};

/// Run until the frame at `frame_index` has returned.
///
/// Built either with a stop-here check for the caller it returns to, or
/// without one when it is itself the continuation of a stop-here check.
#[derive(Debug)]
pub struct StepOutPlan {
    id: PlanId,
    thread: ThreadId,
    frame_index: usize,
    stepping_out_of: FrameOrigin,
    return_address: Option<u64>,
    stop_others: bool,
    stop_vote: Vote,
    run_vote: Vote,
    stop_here: Option<ShouldStopHere>,
}

impl StepOutPlan {
    /// Step out and then consult stop-here (as Older) in the caller.
    ///
    /// None when the thread has no frame at `frame_index`.
    pub fn new(
        cx: &StopContext<'_>,
        frame_index: usize,
        stop_others: bool,
        stop_vote: Vote,
        run_vote: Vote,
        step_out_avoids_no_debug: LazyBool,
    ) -> Option<Self> {
        let mut plan = Self::build(cx, frame_index, stop_others, stop_vote, run_vote)?;

        let flags = cx.settings().avoid_flags(LazyBool::No, step_out_avoids_no_debug);
        plan.stop_here = Some(ShouldStopHere::with_flags(plan.id, flags));
        Some(plan)
    }

    /// Step out and stop in the caller unconditionally
    pub fn no_should_stop(
        cx: &StopContext<'_>,
        frame_index: usize,
        stop_others: bool,
        stop_vote: Vote,
        run_vote: Vote,
    ) -> Option<Self> {
        Self::build(cx, frame_index, stop_others, stop_vote, run_vote)
    }

    fn build(
        cx: &StopContext<'_>,
        frame_index: usize,
        stop_others: bool,
        stop_vote: Vote,
        run_vote: Vote,
    ) -> Option<Self> {
        let stepping_out_of = cx.stack().origin(frame_index)?;
        let return_address = cx
            .stack()
            .frame_at_index(frame_index + 1)
            .map(|caller| caller.pc());

        Some(Self {
            id: PlanId::fresh(),
            thread: cx.thread_id(),
            frame_index,
            stepping_out_of,
            return_address,
            stop_others,
            stop_vote,
            run_vote,
            stop_here: None,
        })
    }

    pub fn return_address(&self) -> Option<u64> {
        self.return_address
    }

    pub fn consults_stop_here(&self) -> bool {
        self.stop_here.is_some()
    }
}

impl ThreadPlan for StepOutPlan {
    fn id(&self) -> PlanId {
        self.id
    }

    fn thread_id(&self) -> ThreadId {
        self.thread
    }

    fn kind(&self) -> PlanKind {
        PlanKind::StepOut
    }

    fn description(&self) -> String {
        match self.return_address {
            Some(addr) => format!("step out of frame #{} to 0x{:x}", self.frame_index, addr),
            None => format!("step out of frame #{}", self.frame_index),
        }
    }

    fn stop_others(&self) -> bool {
        self.stop_others
    }

    fn resume_action(&self) -> ResumeAction {
        ResumeAction::Continue
    }

    fn stop_vote(&self) -> Vote {
        self.stop_vote
    }

    fn run_vote(&self) -> Vote {
        self.run_vote
    }

    fn should_stop(&mut self, cx: &StopContext<'_>) -> PlanStep {
        match cx.stack().compare_to(&self.stepping_out_of) {
            FrameComparison::Older => {
                if let Some(stop_here) = &self.stop_here {
                    if let Some(plan) = stop_here.check_and_redirect(cx, FrameComparison::Older) {
                        return PlanStep::Push(plan);
                    }
                }
                PlanStep::Complete
            }
            FrameComparison::Unknown => PlanStep::Complete,
            FrameComparison::Equal | FrameComparison::Younger | FrameComparison::SameParent => {
                PlanStep::Running
            }
        }
    }

    fn stop_here(&self) -> Option<&ShouldStopHere> {
        self.stop_here.as_ref()
    }

    fn stop_here_mut(&mut self) -> Option<&mut ShouldStopHere> {
        self.stop_here.as_mut()
    }
}
