//! Request handler for stepwise-server

use stepwise_core::protocol::PlanRequest;
use stepwise_core::{
    CallStack, FrameComparison, FrameSnapshot, PlanInfo, Request, Response, StepSettings, Target,
    ThreadId,
};
use tracing::{info, warn};

pub struct Handler {
    target: Target,
}

impl Handler {
    pub fn new(settings: StepSettings) -> Self {
        Self {
            target: Target::new(settings),
        }
    }

    pub fn handle(&mut self, request: &Request) -> Response {
        let result = match request {
            Request::Initialize { settings } => self.handle_initialize(*settings),
            Request::AddThread { thread } => {
                if !self.target.add_thread(*thread) {
                    warn!(%thread, "Thread already registered");
                }
                Ok(Response::success())
            }
            Request::UpdateStack { thread, frames } => self
                .target
                .update_stack(*thread, Self::call_stack(frames))
                .map(|()| Response::success()),
            Request::QueuePlan { thread, plan } => self.handle_queue_plan(*thread, plan),
            Request::Stop { thread, frames } => self.handle_stop(*thread, frames),
            Request::ShouldStopHere { thread, comparison } => {
                self.handle_should_stop_here(*thread, *comparison)
            }
            Request::Plans { thread } => self
                .target
                .plan_infos(*thread)
                .map(|plans| Response::Plans { plans }),
            Request::DiscardPlan { thread, plan } => self
                .target
                .discard_plan(*thread, *plan)
                .map(|()| Response::success()),
            Request::Shutdown => {
                info!("Shutdown requested");
                Ok(Response::success())
            }
        };

        result.unwrap_or_else(|e| {
            warn!("Request failed: {}", e);
            Response::error(e.to_string())
        })
    }

    fn handle_initialize(&mut self, settings: Option<StepSettings>) -> stepwise_core::Result<Response> {
        if let Some(settings) = settings {
            self.target.set_settings(settings);
        }
        info!(settings = ?self.target.settings(), "Initialized");
        Ok(Response::success())
    }

    fn handle_queue_plan(&mut self, thread: ThreadId, plan: &PlanRequest) -> stepwise_core::Result<Response> {
        let plan = match plan {
            PlanRequest::StepIn { range, run_mode } => {
                self.target.queue_step_in_range(thread, *range, *run_mode)?
            }
            PlanRequest::StepOver { range, run_mode } => {
                self.target.queue_step_over_range(thread, *range, *run_mode)?
            }
            PlanRequest::StepOut {
                frame_index,
                stop_others,
            } => self.target.queue_step_out(thread, *frame_index, *stop_others)?,
            PlanRequest::RunTo {
                addresses,
                stop_others,
            } => self
                .target
                .queue_run_to_address(thread, addresses.clone(), *stop_others)?,
        };
        Ok(Response::Queued { plan })
    }

    fn handle_stop(&mut self, thread: ThreadId, frames: &[FrameSnapshot]) -> stepwise_core::Result<Response> {
        let decision = self.target.stop(thread, Self::call_stack(frames))?;
        let plans = self.target.plan_infos(thread)?;
        Ok(Response::decision(decision, plans))
    }

    fn handle_should_stop_here(
        &mut self,
        thread: ThreadId,
        comparison: FrameComparison,
    ) -> stepwise_core::Result<Response> {
        let outcome = self.target.evaluate_stop_here(thread, comparison)?;
        let redirect = outcome
            .redirect
            .map(|plan| PlanInfo::of(plan.as_ref(), false));
        Ok(Response::should_stop_here(outcome.should_stop, redirect))
    }

    fn call_stack(frames: &[FrameSnapshot]) -> CallStack {
        CallStack::from_frames(frames.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::{AddressRange, FnStopHerePolicy, PlanKind, RunMode, StopDecision};

    fn main_at(pc: u64) -> FrameSnapshot {
        FrameSnapshot::new(pc, 0x7000)
            .with_symbol("main", 0x1000, 0x100)
            .with_line(AddressRange::new(0x1000, 0x10), 10)
    }

    fn handler_with_thread() -> Handler {
        let mut handler = Handler::new(StepSettings::default());
        handler.handle(&Request::AddThread { thread: ThreadId(1) });
        handler.handle(&Request::UpdateStack {
            thread: ThreadId(1),
            frames: vec![main_at(0x1000)],
        });
        handler
    }

    #[test]
    fn test_unknown_thread_is_an_error_response() {
        let mut handler = Handler::new(StepSettings::default());
        let resp = handler.handle(&Request::Plans { thread: ThreadId(9) });
        match resp {
            Response::Error { error } => assert!(error.contains("tid 9")),
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[test]
    fn test_step_in_and_stop() {
        let mut handler = handler_with_thread();
        let resp = handler.handle(&Request::QueuePlan {
            thread: ThreadId(1),
            plan: PlanRequest::StepIn {
                range: AddressRange::new(0x1000, 0x10),
                run_mode: RunMode::OnlyDuringStepping,
            },
        });
        let plan = match resp {
            Response::Queued { plan } => plan,
            other => panic!("expected a queued plan, got {:?}", other),
        };

        let resp = handler.handle(&Request::Stop {
            thread: ThreadId(1),
            frames: vec![FrameSnapshot::new(0x1010, 0x7000)
                .with_symbol("main", 0x1000, 0x100)
                .with_line(AddressRange::new(0x1010, 0x8), 11)],
        });
        match resp {
            Response::Decision { decision, plans } => {
                assert_eq!(
                    decision,
                    StopDecision::Stop {
                        plan,
                        kind: PlanKind::StepInRange
                    }
                );
                assert_eq!(plans.len(), 1);
            }
            other => panic!("expected a decision, got {:?}", other),
        }
    }

    #[test]
    fn test_should_stop_here_reports_redirect() {
        let mut handler = handler_with_thread();
        handler.handle(&Request::UpdateStack {
            thread: ThreadId(1),
            frames: vec![
                FrameSnapshot::new(0x4000, 0x6f00)
                    .with_symbol("thunk", 0x4000, 0x40)
                    .with_line(AddressRange::new(0x4000, 0x10), 0),
                main_at(0x1008),
            ],
        });

        let resp = handler.handle(&Request::ShouldStopHere {
            thread: ThreadId(1),
            comparison: FrameComparison::Younger,
        });
        match resp {
            Response::ShouldStopHere { stop, redirect } => {
                assert!(!stop);
                let redirect = redirect.unwrap();
                assert_eq!(redirect.kind, PlanKind::StepInRange);
                assert!(!redirect.controlling);
            }
            other => panic!("expected a should-stop-here answer, got {:?}", other),
        }
    }

    #[test]
    fn test_should_stop_here_without_redirect_reports_the_decision() {
        let mut handler = handler_with_thread();
        let plan = match handler.handle(&Request::QueuePlan {
            thread: ThreadId(1),
            plan: PlanRequest::StepIn {
                range: AddressRange::new(0x1000, 0x10),
                run_mode: RunMode::OnlyDuringStepping,
            },
        }) {
            Response::Queued { plan } => plan,
            other => panic!("expected a queued plan, got {:?}", other),
        };
        handler
            .target
            .set_stop_here_policy(
                ThreadId(1),
                plan,
                Box::new(FnStopHerePolicy::new(|_, _, _| false, |_, _, _| None)),
            )
            .unwrap();

        let resp = handler.handle(&Request::ShouldStopHere {
            thread: ThreadId(1),
            comparison: FrameComparison::Younger,
        });
        match resp {
            Response::ShouldStopHere { stop, redirect } => {
                assert!(!stop);
                assert!(redirect.is_none());
            }
            other => panic!("expected a should-stop-here answer, got {:?}", other),
        }
    }

    #[test]
    fn test_initialize_applies_settings() {
        let mut handler = Handler::new(StepSettings::default());
        let settings = StepSettings {
            step_in_avoid_no_debug: false,
            step_out_avoid_no_debug: true,
        };
        let resp = handler.handle(&Request::Initialize {
            settings: Some(settings),
        });
        assert!(matches!(resp, Response::Success { ok: true }));
        assert_eq!(handler.target.settings(), settings);
    }
}
