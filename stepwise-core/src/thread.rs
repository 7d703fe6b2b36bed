//! A stopped inferior thread and its plan stack
//!
//! The host updates the thread's call stack after each low-level stop and
//! then calls [`Thread::handle_stop`], which walks the plan stack and tells
//! the host whether to hand control to the user or resume.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, StepError};
use crate::flags::{AvoidFlags, FrameComparison, LazyBool, RunMode, Vote};
use crate::frame::{CallStack, StopContext};
use crate::ids::{PlanId, ThreadId};
use crate::plan::{
    PlanInfo, PlanKind, PlanStack, PlanStep, ResumeAction, RunToAddressPlan, StepOutPlan,
    StepRangePlan, ThreadPlan,
};
use crate::settings::StepSettings;
use crate::stop_here::{ShouldStopHere, StopHereOutcome, StopHerePolicy};
use crate::symbol::{AddressRange, SymbolContextScope};

/// What the host should do after a stop has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum StopDecision {
    /// Report the stop to the user; `plan` is the plan that finished
    Stop { plan: PlanId, kind: PlanKind },
    /// Resume silently
    Resume {
        action: ResumeAction,
        stop_others: bool,
    },
}

impl StopDecision {
    pub fn is_stop(&self) -> bool {
        matches!(self, StopDecision::Stop { .. })
    }
}

#[derive(Debug)]
pub struct Thread {
    id: ThreadId,
    stack: CallStack,
    plans: PlanStack,
    settings: StepSettings,
}

impl Thread {
    pub fn new(id: ThreadId, settings: StepSettings) -> Self {
        Self {
            id,
            stack: CallStack::new(),
            plans: PlanStack::new(id),
            settings,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn set_stack(&mut self, stack: CallStack) {
        self.stack = stack;
    }

    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    pub fn plans(&self) -> &PlanStack {
        &self.plans
    }

    pub fn active_plan_id(&self) -> PlanId {
        self.plans.top().plan.id()
    }

    pub fn plan_ids(&self) -> Vec<PlanId> {
        self.plans.ids()
    }

    pub fn plan_infos(&self) -> Vec<PlanInfo> {
        self.plans.infos()
    }

    pub fn context(&self) -> StopContext<'_> {
        StopContext::new(self.id, &self.stack, &self.settings)
    }

    /// Push a user-requested plan
    pub fn queue_plan(&mut self, mut plan: Box<dyn ThreadPlan>) -> PlanId {
        let cx = StopContext::new(self.id, &self.stack, &self.settings);
        plan.did_push(&cx);
        info!(thread = %self.id, plan = %plan.id(), "Queueing {}", plan.description());
        self.plans.push(plan, true)
    }

    pub fn queue_step_in_range(&mut self, range: AddressRange, run_mode: RunMode) -> Result<PlanId> {
        let plan = {
            let cx = self.context();
            let frame = cx.current_frame().ok_or_else(|| StepError::no_frame(self.id, 0))?;
            let sc = frame.symbol_context(SymbolContextScope::all());
            StepRangePlan::step_in(&cx, range, sc, run_mode, LazyBool::Calculate, LazyBool::Calculate)
        };
        Ok(self.queue_plan(Box::new(plan)))
    }

    pub fn queue_step_over_range(&mut self, range: AddressRange, run_mode: RunMode) -> Result<PlanId> {
        let plan = {
            let cx = self.context();
            let frame = cx.current_frame().ok_or_else(|| StepError::no_frame(self.id, 0))?;
            let sc = frame.symbol_context(SymbolContextScope::all());
            StepRangePlan::step_over(&cx, range, sc, run_mode, LazyBool::Calculate)
        };
        Ok(self.queue_plan(Box::new(plan)))
    }

    /// Step out of `frame_index`, then apply stop-here in the caller
    pub fn queue_step_out(&mut self, frame_index: usize, stop_others: bool) -> Result<PlanId> {
        let plan = StepOutPlan::new(
            &self.context(),
            frame_index,
            stop_others,
            Vote::Yes,
            Vote::NoOpinion,
            LazyBool::Calculate,
        )
        .ok_or_else(|| StepError::no_frame(self.id, frame_index))?;
        Ok(self.queue_plan(Box::new(plan)))
    }

    pub fn queue_step_out_no_should_stop(
        &mut self,
        frame_index: usize,
        stop_others: bool,
    ) -> Result<PlanId> {
        let plan = StepOutPlan::no_should_stop(
            &self.context(),
            frame_index,
            stop_others,
            Vote::Yes,
            Vote::NoOpinion,
        )
        .ok_or_else(|| StepError::no_frame(self.id, frame_index))?;
        Ok(self.queue_plan(Box::new(plan)))
    }

    pub fn queue_run_to_address(&mut self, addresses: Vec<u64>, stop_others: bool) -> PlanId {
        self.queue_plan(Box::new(RunToAddressPlan::new(self.id, addresses, stop_others)))
    }

    /// Drop `plan` and everything above it
    pub fn discard_plan(&mut self, plan: PlanId) -> Result<()> {
        let dropped = self.plans.discard(plan)?;
        debug!(thread = %self.id, %plan, dropped, "Discarded plans");
        Ok(())
    }

    pub fn discard_plans_above(&mut self, plan: PlanId) -> Result<()> {
        let dropped = self.plans.discard_above(plan)?;
        debug!(thread = %self.id, %plan, dropped, "Discarded plans above");
        Ok(())
    }

    /// Install a custom stop-here policy on a stacked plan
    pub fn set_stop_here_policy(&mut self, plan: PlanId, policy: Box<dyn StopHerePolicy>) -> Result<()> {
        self.stop_here_of(plan)?.set_policy(policy);
        Ok(())
    }

    pub fn set_avoid_flags(&mut self, plan: PlanId, flags: AvoidFlags) -> Result<()> {
        self.stop_here_of(plan)?.set_flags(flags);
        Ok(())
    }

    fn stop_here_of(&mut self, plan: PlanId) -> Result<&mut ShouldStopHere> {
        let thread = self.id;
        self.plans
            .get_mut(plan)
            .ok_or_else(|| StepError::unknown_plan(thread, plan))?
            .stop_here_mut()
            .ok_or(StepError::NoStopHerePolicy(plan))
    }

    /// The stop-here decision of the topmost plan that has one.
    ///
    /// With no such plan the default policy runs with no avoidance flags.
    pub fn should_stop_here(&self, comparison: FrameComparison) -> bool {
        let cx = self.context();
        self.with_active_stop_here(|stop_here| stop_here.invoke_should_stop_here(&cx, comparison))
    }

    /// Decide and, when the answer is "don't stop", build the redirection.
    ///
    /// The returned plan is not pushed; the caller owns it.
    pub fn check_should_stop_here(&self, comparison: FrameComparison) -> Option<Box<dyn ThreadPlan>> {
        self.evaluate_stop_here(comparison).redirect
    }

    pub fn evaluate_stop_here(&self, comparison: FrameComparison) -> StopHereOutcome {
        let cx = self.context();
        self.with_active_stop_here(|stop_here| stop_here.evaluate(&cx, comparison))
    }

    fn with_active_stop_here<R>(&self, f: impl FnOnce(&ShouldStopHere) -> R) -> R {
        let active = self
            .plans
            .iter_from_top()
            .find_map(|entry| entry.plan.stop_here());
        match active {
            Some(stop_here) => f(stop_here),
            None => f(&ShouldStopHere::new(self.active_plan_id())),
        }
    }

    /// Run the plan stack against the current stop.
    pub fn handle_stop(&mut self) -> StopDecision {
        loop {
            let cx = StopContext::new(self.id, &self.stack, &self.settings);
            let step = self.plans.top_mut().plan.should_stop(&cx);

            match step {
                PlanStep::Running => {
                    let top = self.plans.top();
                    return StopDecision::Resume {
                        action: top.plan.resume_action(),
                        stop_others: top.plan.stop_others(),
                    };
                }
                PlanStep::Push(mut plan) => {
                    plan.did_push(&cx);
                    info!(
                        thread = %self.id,
                        pc = %cx.pc_display(),
                        "Redirecting with {}",
                        plan.description()
                    );
                    let decision = StopDecision::Resume {
                        action: plan.resume_action(),
                        stop_others: plan.stop_others(),
                    };
                    self.plans.push(plan, false);
                    return decision;
                }
                PlanStep::Complete => {
                    let Some(finished) = self.plans.pop() else {
                        let base = self.plans.top().plan.id();
                        return StopDecision::Stop {
                            plan: base,
                            kind: PlanKind::Base,
                        };
                    };

                    let plan = finished.plan.id();
                    let kind = finished.plan.kind();
                    if finished.controlling {
                        info!(thread = %self.id, %plan, pc = %cx.pc_display(), "{} complete, stopping", kind);
                        return StopDecision::Stop { plan, kind };
                    }
                    debug!(thread = %self.id, %plan, "{} complete, re-evaluating the plan below", kind);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameSnapshot;
    use crate::stop_here::FnStopHerePolicy;

    const LINE_10: AddressRange = AddressRange { base: 0x1000, byte_size: 0x10 };

    fn main_at(pc: u64, range: AddressRange, line: u32) -> FrameSnapshot {
        FrameSnapshot::new(pc, 0x7000)
            .with_symbol("main", 0x1000, 0x100)
            .with_line(range, line)
            .with_function("main")
    }

    fn thread_at(frames: Vec<FrameSnapshot>) -> Thread {
        let mut thread = Thread::new(ThreadId(1), StepSettings::default());
        thread.set_stack(CallStack::from_frames(frames));
        thread
    }

    fn stop_at(thread: &mut Thread, frames: Vec<FrameSnapshot>) -> StopDecision {
        thread.set_stack(CallStack::from_frames(frames));
        thread.handle_stop()
    }

    #[test]
    fn test_base_plan_stops() {
        let mut thread = thread_at(vec![main_at(0x1000, LINE_10, 10)]);
        let decision = thread.handle_stop();
        assert_eq!(
            decision,
            StopDecision::Stop {
                plan: thread.plan_ids()[0],
                kind: PlanKind::Base
            }
        );
        assert_eq!(thread.plans().depth(), 1);
    }

    #[test]
    fn test_step_in_through_line_zero_function() {
        let mut thread = thread_at(vec![main_at(0x1000, LINE_10, 10)]);
        let step_in = thread.queue_step_in_range(LINE_10, RunMode::OnlyDuringStepping).unwrap();

        let decision = stop_at(&mut thread, vec![main_at(0x1008, LINE_10, 10)]);
        assert_eq!(
            decision,
            StopDecision::Resume {
                action: ResumeAction::SingleStep,
                stop_others: true
            }
        );

        // Land in a thunk made entirely of line-0 code.
        let thunk = FrameSnapshot::new(0x4000, 0x6f00)
            .with_symbol("thunk", 0x4000, 0x10)
            .with_line(AddressRange::new(0x4000, 0x10), 0);
        let decision = stop_at(&mut thread, vec![thunk, main_at(0x100c, LINE_10, 10)]);
        assert_eq!(
            decision,
            StopDecision::Resume {
                action: ResumeAction::Continue,
                stop_others: false
            }
        );
        assert_eq!(thread.plans().top().plan.kind(), PlanKind::StepOut);
        assert!(!thread.plans().top().controlling);

        // Back in main mid-line: the step-out finishes and step-in carries on.
        let decision = stop_at(&mut thread, vec![main_at(0x100c, LINE_10, 10)]);
        assert!(!decision.is_stop());
        assert_eq!(thread.active_plan_id(), step_in);

        let decision = stop_at(&mut thread, vec![main_at(0x1010, AddressRange::new(0x1010, 8), 11)]);
        assert_eq!(
            decision,
            StopDecision::Stop {
                plan: step_in,
                kind: PlanKind::StepInRange
            }
        );
        assert_eq!(thread.plans().depth(), 1);
    }

    #[test]
    fn test_step_over_returns_to_origin() {
        let mut thread = thread_at(vec![main_at(0x1000, LINE_10, 10)]);
        let over = thread.queue_step_over_range(LINE_10, RunMode::AllThreads).unwrap();

        let callee = FrameSnapshot::new(0x3000, 0x6f00)
            .with_symbol("helper", 0x3000, 0x40)
            .with_line(AddressRange::new(0x3000, 8), 42);
        let decision = stop_at(&mut thread, vec![callee, main_at(0x1008, LINE_10, 10)]);
        assert_eq!(
            decision,
            StopDecision::Resume {
                action: ResumeAction::Continue,
                stop_others: false
            }
        );

        let decision = stop_at(&mut thread, vec![main_at(0x1008, LINE_10, 10)]);
        assert!(!decision.is_stop());
        assert_eq!(thread.active_plan_id(), over);

        let decision = stop_at(&mut thread, vec![main_at(0x1010, AddressRange::new(0x1010, 8), 11)]);
        assert!(decision.is_stop());
    }

    #[test]
    fn test_step_out_stops_in_caller() {
        let caller = FrameSnapshot::new(0x2010, 0x7100)
            .with_symbol("caller", 0x2000, 0x100)
            .with_line(AddressRange::new(0x2010, 8), 20);
        let mut thread = thread_at(vec![main_at(0x1004, LINE_10, 10), caller.clone()]);
        let out = thread.queue_step_out(0, false).unwrap();

        let mut returned = caller;
        returned.pc = 0x2014;
        let decision = stop_at(&mut thread, vec![returned]);
        assert_eq!(
            decision,
            StopDecision::Stop {
                plan: out,
                kind: PlanKind::StepOut
            }
        );
    }

    #[test]
    fn test_missing_frame_errors() {
        let mut thread = Thread::new(ThreadId(9), StepSettings::default());
        let err = thread.queue_step_in_range(LINE_10, RunMode::default()).unwrap_err();
        assert!(matches!(err, StepError::NoFrame { index: 0, .. }));

        let err = thread.queue_step_out(2, false).unwrap_err();
        assert!(matches!(err, StepError::NoFrame { index: 2, .. }));
    }

    #[test]
    fn test_run_to_address() {
        let mut thread = thread_at(vec![main_at(0x1000, LINE_10, 10)]);
        let plan = thread.queue_run_to_address(vec![0x1040], true);

        let decision = stop_at(&mut thread, vec![main_at(0x1020, LINE_10, 10)]);
        assert_eq!(
            decision,
            StopDecision::Resume {
                action: ResumeAction::Continue,
                stop_others: true
            }
        );

        let decision = stop_at(&mut thread, vec![main_at(0x1040, LINE_10, 10)]);
        assert_eq!(
            decision,
            StopDecision::Stop {
                plan,
                kind: PlanKind::RunToAddress
            }
        );
    }

    #[test]
    fn test_no_frame_means_stop_and_no_redirect() {
        let mut thread = thread_at(vec![main_at(0x1000, LINE_10, 10)]);
        thread.queue_step_in_range(LINE_10, RunMode::default()).unwrap();
        thread.set_stack(CallStack::new());

        assert!(thread.should_stop_here(FrameComparison::Younger));
        assert!(thread.check_should_stop_here(FrameComparison::Younger).is_none());
        assert!(thread.handle_stop().is_stop());
    }

    #[test]
    fn test_check_is_idempotent() {
        let thunk = FrameSnapshot::new(0x4000, 0x6f00)
            .with_symbol("thunk", 0x4000, 0x40)
            .with_line(AddressRange::new(0x4000, 0x10), 0);
        let thread = thread_at(vec![thunk, main_at(0x1008, LINE_10, 10)]);

        let first = thread.check_should_stop_here(FrameComparison::Younger).unwrap();
        let second = thread.check_should_stop_here(FrameComparison::Younger).unwrap();
        assert_eq!(first.kind(), PlanKind::StepInRange);
        assert_eq!(first.kind(), second.kind());
        assert_eq!(first.ranges(), second.ranges());
        assert_eq!(thread.plans().depth(), 1);
    }

    #[test]
    fn test_custom_policy_and_flags_on_plan() {
        let mut thread = thread_at(vec![main_at(0x1000, LINE_10, 10)]);
        let plan = thread.queue_step_in_range(LINE_10, RunMode::default()).unwrap();

        thread
            .set_stop_here_policy(plan, Box::new(FnStopHerePolicy::new(|_, _, _| true, |_, _, _| None)))
            .unwrap();
        thread.set_avoid_flags(plan, AvoidFlags::all()).unwrap();

        let thunk = FrameSnapshot::new(0x4000, 0x6f00)
            .with_symbol("thunk", 0x4000, 0x10)
            .with_line(AddressRange::new(0x4000, 0x10), 0);
        let decision = stop_at(&mut thread, vec![thunk, main_at(0x1008, LINE_10, 10)]);
        assert!(decision.is_stop());

        let run_to = thread.queue_run_to_address(vec![0x10], false);
        let err = thread.set_avoid_flags(run_to, AvoidFlags::empty()).unwrap_err();
        assert!(matches!(err, StepError::NoStopHerePolicy(id) if id == run_to));
    }

    #[test]
    fn test_rejected_stop_without_redirect_is_not_a_stop() {
        let mut thread = thread_at(vec![main_at(0x1000, LINE_10, 10)]);
        let plan = thread.queue_step_in_range(LINE_10, RunMode::default()).unwrap();
        thread
            .set_stop_here_policy(plan, Box::new(FnStopHerePolicy::new(|_, _, _| false, |_, _, _| None)))
            .unwrap();

        let outcome = thread.evaluate_stop_here(FrameComparison::Younger);
        assert!(!outcome.should_stop);
        assert!(outcome.redirect.is_none());
        assert!(!thread.should_stop_here(FrameComparison::Younger));
        assert!(thread.check_should_stop_here(FrameComparison::Younger).is_none());
    }

    #[test]
    fn test_discard_plans() {
        let mut thread = thread_at(vec![main_at(0x1000, LINE_10, 10)]);
        let first = thread.queue_run_to_address(vec![0x10], false);
        let second = thread.queue_run_to_address(vec![0x20], false);

        thread.discard_plans_above(first).unwrap();
        assert_eq!(thread.active_plan_id(), first);
        assert!(thread.discard_plan(second).is_err());

        thread.discard_plan(first).unwrap();
        assert_eq!(thread.plans().depth(), 1);

        let base = thread.active_plan_id();
        assert!(matches!(thread.discard_plan(base), Err(StepError::BasePlan(_))));
    }

    #[test]
    fn test_stop_decision_serde() {
        let decision = StopDecision::Resume {
            action: ResumeAction::SingleStep,
            stop_others: true,
        };
        let json = serde_json::to_string(&decision).unwrap();
        assert_eq!(json, r#"{"decision":"resume","action":"single_step","stop_others":true}"#);
    }
}
