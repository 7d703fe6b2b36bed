use tracing::debug;

use crate::flags::{AvoidFlags, FrameComparison, LazyBool, RunMode, Vote};
use crate::frame::{FrameOrigin, StopContext};
use crate::ids::{PlanId, ThreadId};
use crate::stop_here::ShouldStopHere;
use crate::symbol::{AddressRange, SymbolContext, SymbolContextScope};

use super::{PlanKind, PlanStep, ResumeAction, StepOutPlan, ThreadPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFlavor {
    /// Follow calls into callees
    Into,
    /// Run calls to completion
    Over,
}

/// Single-step while the pc stays inside a set of address ranges in the
/// originating frame.
///
/// Once execution leaves, the stop-here protocol decides whether that is
/// where the step ends; a step-over plan instead steps straight back out
/// of any callee it enters.
#[derive(Debug)]
pub struct StepRangePlan {
    id: PlanId,
    thread: ThreadId,
    flavor: StepFlavor,
    ranges: Vec<AddressRange>,
    context: SymbolContext,
    run_mode: RunMode,
    origin: Option<FrameOrigin>,
    stop_here: ShouldStopHere,
}

impl StepRangePlan {
    pub fn step_in(
        cx: &StopContext<'_>,
        range: AddressRange,
        context: SymbolContext,
        run_mode: RunMode,
        step_in_avoids_no_debug: LazyBool,
        step_out_avoids_no_debug: LazyBool,
    ) -> Self {
        let flags = cx
            .settings()
            .avoid_flags(step_in_avoids_no_debug, step_out_avoids_no_debug);
        Self::build(cx, StepFlavor::Into, range, context, run_mode, flags)
    }

    pub fn step_over(
        cx: &StopContext<'_>,
        range: AddressRange,
        context: SymbolContext,
        run_mode: RunMode,
        step_out_avoids_no_debug: LazyBool,
    ) -> Self {
        let flags = cx.settings().avoid_flags(LazyBool::No, step_out_avoids_no_debug);
        Self::build(cx, StepFlavor::Over, range, context, run_mode, flags)
    }

    fn build(
        cx: &StopContext<'_>,
        flavor: StepFlavor,
        range: AddressRange,
        context: SymbolContext,
        run_mode: RunMode,
        flags: AvoidFlags,
    ) -> Self {
        let id = PlanId::fresh();
        Self {
            id,
            thread: cx.thread_id(),
            flavor,
            ranges: vec![range],
            context,
            run_mode,
            origin: cx.stack().origin(0),
            stop_here: ShouldStopHere::with_flags(id, flags),
        }
    }

    fn in_range(&self, pc: u64) -> bool {
        self.ranges.iter().any(|range| range.contains(pc))
    }

    // Several line-table rows can belong to the same source line; keep
    // stepping through them as one.
    fn extend_over_same_line(&mut self, cx: &StopContext<'_>) -> bool {
        let Some(stepping_line) = &self.context.line_entry else {
            return false;
        };
        if stepping_line.is_line_zero() {
            return false;
        }
        let Some(frame) = cx.current_frame() else {
            return false;
        };

        match frame.symbol_context(SymbolContextScope::LINE_ENTRY).line_entry {
            Some(entry) if entry.same_line_as(stepping_line) => {
                debug!(plan = %self.id, range = %entry.range, "Extending step range over another row of line {}", entry.line);
                self.ranges.push(entry.range);
                true
            }
            _ => false,
        }
    }

    fn redirect_or_complete(&self, cx: &StopContext<'_>, comparison: FrameComparison) -> PlanStep {
        match self.stop_here.check_and_redirect(cx, comparison) {
            Some(plan) => PlanStep::Push(plan),
            None => PlanStep::Complete,
        }
    }
}

impl ThreadPlan for StepRangePlan {
    fn id(&self) -> PlanId {
        self.id
    }

    fn thread_id(&self) -> ThreadId {
        self.thread
    }

    fn kind(&self) -> PlanKind {
        match self.flavor {
            StepFlavor::Into => PlanKind::StepInRange,
            StepFlavor::Over => PlanKind::StepOverRange,
        }
    }

    fn description(&self) -> String {
        let verb = match self.flavor {
            StepFlavor::Into => "step in",
            StepFlavor::Over => "step over",
        };
        let ranges: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        format!("{} range {}", verb, ranges.join(" "))
    }

    fn stop_others(&self) -> bool {
        self.run_mode.stops_others()
    }

    fn resume_action(&self) -> ResumeAction {
        ResumeAction::SingleStep
    }

    fn ranges(&self) -> Vec<AddressRange> {
        self.ranges.clone()
    }

    fn should_stop(&mut self, cx: &StopContext<'_>) -> PlanStep {
        let Some(pc) = cx.pc() else {
            return PlanStep::Complete;
        };
        let comparison = match &self.origin {
            Some(origin) => cx.stack().compare_to(origin),
            None => FrameComparison::Unknown,
        };

        match comparison {
            FrameComparison::Equal => {
                if self.in_range(pc) || self.extend_over_same_line(cx) {
                    return PlanStep::Running;
                }
                self.redirect_or_complete(cx, comparison)
            }
            FrameComparison::Younger if self.flavor == StepFlavor::Over => {
                debug!(plan = %self.id, pc = %cx.pc_display(), "Stepped into a call, stepping back out");
                match StepOutPlan::no_should_stop(cx, 0, self.stop_others(), Vote::No, Vote::NoOpinion) {
                    Some(plan) => PlanStep::Push(Box::new(plan)),
                    None => PlanStep::Complete,
                }
            }
            FrameComparison::Unknown => PlanStep::Complete,
            FrameComparison::Younger | FrameComparison::Older | FrameComparison::SameParent => {
                self.redirect_or_complete(cx, comparison)
            }
        }
    }

    fn stop_here(&self) -> Option<&ShouldStopHere> {
        Some(&self.stop_here)
    }

    fn stop_here_mut(&mut self) -> Option<&mut ShouldStopHere> {
        Some(&mut self.stop_here)
    }
}
