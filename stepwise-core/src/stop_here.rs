//! Should-stop-here protocol
//!
//! After a stepping plan leaves its range it asks its [`ShouldStopHere`]
//! whether the new location is somewhere the user wants to stop. If not,
//! the policy's continuation supplies a plan that gets execution somewhere
//! better: through a line-0 row, or out of the frame entirely.
//!
//! Plans install their own [`StopHerePolicy`] to change either half; the
//! state a custom policy needs lives inside the policy value itself.

use std::fmt;
use tracing::debug;

use crate::flags::{AvoidFlags, FrameComparison, LazyBool, RunMode, Vote};
use crate::frame::StopContext;
use crate::ids::PlanId;
use crate::plan::{StepOutPlan, StepRangePlan, ThreadPlan};
use crate::range::row_step_range;
use crate::symbol::SymbolContextScope;

/// Decision plus continuation pair
pub trait StopHerePolicy: Send + Sync {
    /// Should the step end at the current location?
    fn should_stop_here(
        &self,
        cx: &StopContext<'_>,
        flags: AvoidFlags,
        comparison: FrameComparison,
    ) -> bool;

    /// Plan to run after `should_stop_here` said no, or None to let the
    /// current plan finish on its own terms.
    fn step_from_here(
        &self,
        cx: &StopContext<'_>,
        flags: AvoidFlags,
        comparison: FrameComparison,
    ) -> Option<Box<dyn ThreadPlan>>;
}

/// Skip frames without debug info per the flags, and always skip line 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStopHerePolicy;

impl DefaultStopHerePolicy {
    pub fn default_should_stop_here(
        cx: &StopContext<'_>,
        flags: AvoidFlags,
        comparison: FrameComparison,
    ) -> bool {
        let Some(frame) = cx.current_frame() else {
            return true;
        };

        let mut should_stop_here = true;

        if flags.avoids_no_debug(comparison) && !frame.has_debug_info() {
            debug!(%comparison, "Stepping out of frame with no debug info");
            should_stop_here = false;
        }

        // Line 0 is never user code, whatever the flags say.
        let sc = frame.symbol_context(SymbolContextScope::LINE_ENTRY);
        if sc.is_line_zero() {
            should_stop_here = false;
        }

        should_stop_here
    }

    pub fn default_step_from_here(
        cx: &StopContext<'_>,
        _flags: AvoidFlags,
        _comparison: FrameComparison,
    ) -> Option<Box<dyn ThreadPlan>> {
        const STOP_OTHERS: bool = false;
        const FRAME_INDEX: usize = 0;

        let frame = cx.current_frame()?;
        let sc = frame.symbol_context(SymbolContextScope::LINE_ENTRY | SymbolContextScope::SYMBOL);

        let mut plan: Option<Box<dyn ThreadPlan>> = None;
        if sc.is_line_zero() {
            if let Some(row) = row_step_range(&sc) {
                if row.spans_function {
                    debug!(
                        pc = %cx.pc_display(),
                        "Stopped in a function with only line 0 lines, just stepping out"
                    );
                } else {
                    debug!(range = %row.range, "Queueing step-in-range plan to step through line 0 code");
                    plan = Some(Box::new(StepRangePlan::step_in(
                        cx,
                        row.range,
                        sc.clone(),
                        RunMode::OnlyDuringStepping,
                        LazyBool::Calculate,
                        LazyBool::No,
                    )));
                }
            }
        }

        plan.or_else(|| {
            StepOutPlan::no_should_stop(cx, FRAME_INDEX, STOP_OTHERS, Vote::No, Vote::NoOpinion)
                .map(|plan| Box::new(plan) as Box<dyn ThreadPlan>)
        })
    }
}

impl StopHerePolicy for DefaultStopHerePolicy {
    fn should_stop_here(
        &self,
        cx: &StopContext<'_>,
        flags: AvoidFlags,
        comparison: FrameComparison,
    ) -> bool {
        Self::default_should_stop_here(cx, flags, comparison)
    }

    fn step_from_here(
        &self,
        cx: &StopContext<'_>,
        flags: AvoidFlags,
        comparison: FrameComparison,
    ) -> Option<Box<dyn ThreadPlan>> {
        Self::default_step_from_here(cx, flags, comparison)
    }
}

type StepFromHereFn = for<'a, 'b> fn(
    &'a StopContext<'b>,
    AvoidFlags,
    FrameComparison,
) -> Option<Box<dyn ThreadPlan>>;

/// A policy built from two closures; whatever they capture is their context
pub struct FnStopHerePolicy<D, S> {
    decide: D,
    step: S,
}

impl<D, S> FnStopHerePolicy<D, S> {
    pub fn new(decide: D, step: S) -> Self
    where
        D: Fn(&StopContext<'_>, AvoidFlags, FrameComparison) -> bool + Send + Sync,
        S: Fn(&StopContext<'_>, AvoidFlags, FrameComparison) -> Option<Box<dyn ThreadPlan>>
            + Send
            + Sync,
    {
        Self { decide, step }
    }
}

impl<D> FnStopHerePolicy<D, StepFromHereFn> {
    /// Custom decision, default continuation
    pub fn decide_only(decide: D) -> Self
    where
        D: Fn(&StopContext<'_>, AvoidFlags, FrameComparison) -> bool + Send + Sync,
    {
        Self {
            decide,
            step: DefaultStopHerePolicy::default_step_from_here,
        }
    }
}

impl<D, S> StopHerePolicy for FnStopHerePolicy<D, S>
where
    D: Fn(&StopContext<'_>, AvoidFlags, FrameComparison) -> bool + Send + Sync,
    S: Fn(&StopContext<'_>, AvoidFlags, FrameComparison) -> Option<Box<dyn ThreadPlan>>
        + Send
        + Sync,
{
    fn should_stop_here(
        &self,
        cx: &StopContext<'_>,
        flags: AvoidFlags,
        comparison: FrameComparison,
    ) -> bool {
        (self.decide)(cx, flags, comparison)
    }

    fn step_from_here(
        &self,
        cx: &StopContext<'_>,
        flags: AvoidFlags,
        comparison: FrameComparison,
    ) -> Option<Box<dyn ThreadPlan>> {
        (self.step)(cx, flags, comparison)
    }
}

/// What one stop-here check concluded
#[derive(Debug)]
pub struct StopHereOutcome {
    /// The decision's answer
    pub should_stop: bool,
    /// The continuation's plan, only ever set when the decision said no
    pub redirect: Option<Box<dyn ThreadPlan>>,
}

/// The stop-here state a stepping plan carries: its flags and its policy
pub struct ShouldStopHere {
    owner: PlanId,
    flags: AvoidFlags,
    policy: Box<dyn StopHerePolicy>,
}

impl ShouldStopHere {
    pub fn new(owner: PlanId) -> Self {
        Self {
            owner,
            flags: AvoidFlags::empty(),
            policy: Box::new(DefaultStopHerePolicy),
        }
    }

    pub fn with_flags(owner: PlanId, flags: AvoidFlags) -> Self {
        Self {
            flags,
            ..Self::new(owner)
        }
    }

    pub fn flags(&self) -> AvoidFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: AvoidFlags) {
        self.flags = flags;
    }

    pub fn set_flag(&mut self, flag: AvoidFlags, value: bool) {
        self.flags.set(flag, value);
    }

    /// Replace the decision/continuation pair
    pub fn set_policy(&mut self, policy: Box<dyn StopHerePolicy>) {
        self.policy = policy;
    }

    pub fn reset_policy(&mut self) {
        self.policy = Box::new(DefaultStopHerePolicy);
    }

    /// Run the decision alone
    pub fn invoke_should_stop_here(&self, cx: &StopContext<'_>, comparison: FrameComparison) -> bool {
        self.decide(cx, self.flags, comparison)
    }

    /// Run the continuation alone
    pub fn queue_step_out_from_here(
        &self,
        cx: &StopContext<'_>,
        flags: AvoidFlags,
        comparison: FrameComparison,
    ) -> Option<Box<dyn ThreadPlan>> {
        let plan = self.policy.step_from_here(cx, flags, comparison);
        if let Some(plan) = &plan {
            debug!(
                owner = %self.owner,
                redirect = %plan.description(),
                "StepFromHere produced a plan"
            );
        }
        plan
    }

    /// Decide, and on "don't stop" ask the continuation for a plan.
    ///
    /// Both halves see the same copy of the flags.
    pub fn evaluate(&self, cx: &StopContext<'_>, comparison: FrameComparison) -> StopHereOutcome {
        let flags = self.flags;
        if self.decide(cx, flags, comparison) {
            StopHereOutcome {
                should_stop: true,
                redirect: None,
            }
        } else {
            StopHereOutcome {
                should_stop: false,
                redirect: self.queue_step_out_from_here(cx, flags, comparison),
            }
        }
    }

    /// The redirection plan, if any.
    ///
    /// None means no redirection: either this is a stop, or the
    /// continuation had nothing to offer.
    pub fn check_and_redirect(
        &self,
        cx: &StopContext<'_>,
        comparison: FrameComparison,
    ) -> Option<Box<dyn ThreadPlan>> {
        self.evaluate(cx, comparison).redirect
    }

    fn decide(&self, cx: &StopContext<'_>, flags: AvoidFlags, comparison: FrameComparison) -> bool {
        let should_stop_here = self.policy.should_stop_here(cx, flags, comparison);
        debug!(
            owner = %self.owner,
            thread = %cx.thread_id(),
            %comparison,
            "ShouldStopHere callback returned {} from {}",
            should_stop_here,
            cx.pc_display()
        );
        should_stop_here
    }
}

impl fmt::Debug for ShouldStopHere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShouldStopHere")
            .field("owner", &self.owner)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
