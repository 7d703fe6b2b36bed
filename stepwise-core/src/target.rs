//! Target: the set of threads being stepped
//!
//! Every control-plane entry point takes the target's reentrant API lock for
//! its whole duration, so a stop can update the stack and drive the plans
//! as one step while other callers wait.
//!
//! A thread is checked out of the map while its plans and stop-here policies
//! run. A policy that calls back into the target on the same OS thread gets
//! through the API lock, sees every other thread, and gets
//! [`StepError::ThreadBusy`] for the thread being stepped.

use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{Result, StepError};
use crate::flags::{AvoidFlags, FrameComparison, RunMode};
use crate::frame::CallStack;
use crate::ids::{PlanId, ThreadId};
use crate::plan::{PlanInfo, ThreadPlan};
use crate::settings::StepSettings;
use crate::stop_here::{StopHereOutcome, StopHerePolicy};
use crate::symbol::AddressRange;
use crate::thread::{StopDecision, Thread};

type ThreadMap = HashMap<ThreadId, Option<Thread>>;

#[derive(Debug, Default)]
pub struct Target {
    api_lock: ReentrantMutex<()>,
    /// None while the thread is checked out by `with_thread`
    threads: Mutex<ThreadMap>,
    settings: Mutex<StepSettings>,
}

// Puts a checked-out thread back, including when the closure panics.
struct CheckedOut<'a> {
    threads: &'a Mutex<ThreadMap>,
    id: ThreadId,
    thread: Option<Thread>,
}

impl Drop for CheckedOut<'_> {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            if let Some(slot) = self.threads.lock().get_mut(&self.id) {
                *slot = Some(thread);
            }
        }
    }
}

impl Target {
    pub fn new(settings: StepSettings) -> Self {
        Self {
            api_lock: ReentrantMutex::new(()),
            threads: Mutex::new(HashMap::new()),
            settings: Mutex::new(settings),
        }
    }

    pub fn settings(&self) -> StepSettings {
        *self.settings.lock()
    }

    /// Settings apply to threads added afterwards
    pub fn set_settings(&self, settings: StepSettings) {
        let _api = self.api_lock.lock();
        *self.settings.lock() = settings;
        info!(?settings, "Updated step settings");
    }

    /// Register a thread; false when it was already known
    pub fn add_thread(&self, id: ThreadId) -> bool {
        let _api = self.api_lock.lock();
        let settings = self.settings();
        let mut threads = self.threads.lock();
        if threads.contains_key(&id) {
            return false;
        }
        threads.insert(id, Some(Thread::new(id, settings)));
        debug!(thread = %id, "Added thread");
        true
    }

    pub fn remove_thread(&self, id: ThreadId) -> Result<()> {
        let _api = self.api_lock.lock();
        let mut threads = self.threads.lock();
        match threads.get(&id) {
            None => Err(StepError::UnknownThread(id)),
            Some(None) => Err(StepError::ThreadBusy(id)),
            Some(Some(_)) => {
                threads.remove(&id);
                Ok(())
            }
        }
    }

    pub fn thread_ids(&self) -> Vec<ThreadId> {
        let _api = self.api_lock.lock();
        let mut ids: Vec<ThreadId> = self.threads.lock().keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    /// Run `f` against one thread under the API lock.
    ///
    /// The thread map itself is unlocked while `f` runs.
    pub fn with_thread<R>(&self, id: ThreadId, f: impl FnOnce(&mut Thread) -> Result<R>) -> Result<R> {
        let _api = self.api_lock.lock();
        let thread = match self.threads.lock().get_mut(&id) {
            None => return Err(StepError::UnknownThread(id)),
            Some(slot) => slot.take().ok_or(StepError::ThreadBusy(id))?,
        };

        let mut checked_out = CheckedOut {
            threads: &self.threads,
            id,
            thread: Some(thread),
        };
        match checked_out.thread.as_mut() {
            Some(thread) => f(thread),
            None => Err(StepError::ThreadBusy(id)),
        }
    }

    pub fn update_stack(&self, id: ThreadId, stack: CallStack) -> Result<()> {
        self.with_thread(id, |thread| {
            thread.set_stack(stack);
            Ok(())
        })
    }

    pub fn queue_step_in_range(&self, id: ThreadId, range: AddressRange, run_mode: RunMode) -> Result<PlanId> {
        self.with_thread(id, |thread| thread.queue_step_in_range(range, run_mode))
    }

    pub fn queue_step_over_range(&self, id: ThreadId, range: AddressRange, run_mode: RunMode) -> Result<PlanId> {
        self.with_thread(id, |thread| thread.queue_step_over_range(range, run_mode))
    }

    pub fn queue_step_out(&self, id: ThreadId, frame_index: usize, stop_others: bool) -> Result<PlanId> {
        self.with_thread(id, |thread| thread.queue_step_out(frame_index, stop_others))
    }

    pub fn queue_step_out_no_should_stop(
        &self,
        id: ThreadId,
        frame_index: usize,
        stop_others: bool,
    ) -> Result<PlanId> {
        self.with_thread(id, |thread| {
            thread.queue_step_out_no_should_stop(frame_index, stop_others)
        })
    }

    pub fn queue_run_to_address(&self, id: ThreadId, addresses: Vec<u64>, stop_others: bool) -> Result<PlanId> {
        self.with_thread(id, |thread| Ok(thread.queue_run_to_address(addresses, stop_others)))
    }

    pub fn discard_plan(&self, id: ThreadId, plan: PlanId) -> Result<()> {
        self.with_thread(id, |thread| thread.discard_plan(plan))
    }

    pub fn set_stop_here_policy(
        &self,
        id: ThreadId,
        plan: PlanId,
        policy: Box<dyn StopHerePolicy>,
    ) -> Result<()> {
        self.with_thread(id, |thread| thread.set_stop_here_policy(plan, policy))
    }

    pub fn set_avoid_flags(&self, id: ThreadId, plan: PlanId, flags: AvoidFlags) -> Result<()> {
        self.with_thread(id, |thread| thread.set_avoid_flags(plan, flags))
    }

    pub fn handle_stop(&self, id: ThreadId) -> Result<StopDecision> {
        self.with_thread(id, |thread| Ok(thread.handle_stop()))
    }

    /// Record a new stop location for a thread and run its plans against it.
    ///
    /// The stack update and the plan evaluation happen under one hold of
    /// the API lock.
    pub fn stop(&self, id: ThreadId, stack: CallStack) -> Result<StopDecision> {
        let _api = self.api_lock.lock();
        self.update_stack(id, stack)?;
        self.handle_stop(id)
    }

    pub fn check_should_stop_here(
        &self,
        id: ThreadId,
        comparison: FrameComparison,
    ) -> Result<Option<Box<dyn ThreadPlan>>> {
        self.with_thread(id, |thread| Ok(thread.check_should_stop_here(comparison)))
    }

    pub fn evaluate_stop_here(&self, id: ThreadId, comparison: FrameComparison) -> Result<StopHereOutcome> {
        self.with_thread(id, |thread| Ok(thread.evaluate_stop_here(comparison)))
    }

    pub fn should_stop_here(&self, id: ThreadId, comparison: FrameComparison) -> Result<bool> {
        self.with_thread(id, |thread| Ok(thread.should_stop_here(comparison)))
    }

    pub fn plan_infos(&self, id: ThreadId) -> Result<Vec<PlanInfo>> {
        self.with_thread(id, |thread| Ok(thread.plan_infos()))
    }
}
