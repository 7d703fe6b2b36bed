use serde::{Deserialize, Serialize};

use crate::error::{Result, StepError};
use crate::ids::{PlanId, ThreadId};

use super::{BasePlan, PlanKind, ThreadPlan};

/// A plan on the stack, and whether a user request queued it
#[derive(Debug)]
pub struct PlanEntry {
    pub plan: Box<dyn ThreadPlan>,
    /// Completing this plan hands control back to the user
    pub controlling: bool,
}

/// Summary of a stacked plan, for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInfo {
    pub id: PlanId,
    pub kind: PlanKind,
    pub description: String,
    pub controlling: bool,
}

impl PlanInfo {
    pub fn of(plan: &dyn ThreadPlan, controlling: bool) -> Self {
        Self {
            id: plan.id(),
            kind: plan.kind(),
            description: plan.description(),
            controlling,
        }
    }
}

/// Ordered plans of one thread, bottom first.
///
/// The bottom entry is always the thread's [`BasePlan`]; it can't be popped
/// or discarded.
#[derive(Debug)]
pub struct PlanStack {
    thread: ThreadId,
    entries: Vec<PlanEntry>,
}

impl PlanStack {
    pub fn new(thread: ThreadId) -> Self {
        Self {
            thread,
            entries: vec![PlanEntry {
                plan: Box::new(BasePlan::new(thread)),
                controlling: true,
            }],
        }
    }

    pub fn push(&mut self, plan: Box<dyn ThreadPlan>, controlling: bool) -> PlanId {
        let id = plan.id();
        self.entries.push(PlanEntry { plan, controlling });
        id
    }

    /// Pop the top plan; None when only the base plan is left
    pub fn pop(&mut self) -> Option<PlanEntry> {
        if self.entries.len() > 1 {
            self.entries.pop()
        } else {
            None
        }
    }

    pub fn top(&self) -> &PlanEntry {
        &self.entries[self.entries.len() - 1]
    }

    pub fn top_mut(&mut self) -> &mut PlanEntry {
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn base_is_top(&self) -> bool {
        self.entries.len() == 1
    }

    /// Number of plans including the base plan
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Plan ids, bottom first
    pub fn ids(&self) -> Vec<PlanId> {
        self.entries.iter().map(|entry| entry.plan.id()).collect()
    }

    pub fn infos(&self) -> Vec<PlanInfo> {
        self.entries
            .iter()
            .map(|entry| PlanInfo::of(entry.plan.as_ref(), entry.controlling))
            .collect()
    }

    pub fn get(&self, id: PlanId) -> Option<&dyn ThreadPlan> {
        self.entries
            .iter()
            .find(|entry| entry.plan.id() == id)
            .map(|entry| entry.plan.as_ref())
    }

    pub fn get_mut(&mut self, id: PlanId) -> Option<&mut (dyn ThreadPlan + 'static)> {
        self.entries
            .iter_mut()
            .find(|entry| entry.plan.id() == id)
            .map(|entry| entry.plan.as_mut())
    }

    /// Iterate from the top of the stack down
    pub fn iter_from_top(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().rev()
    }

    fn position(&self, id: PlanId) -> Result<usize> {
        self.entries
            .iter()
            .position(|entry| entry.plan.id() == id)
            .ok_or_else(|| StepError::unknown_plan(self.thread, id))
    }

    /// Drop every plan stacked above `id`; returns how many were dropped
    pub fn discard_above(&mut self, id: PlanId) -> Result<usize> {
        let index = self.position(id)?;
        let dropped = self.entries.len() - index - 1;
        self.entries.truncate(index + 1);
        Ok(dropped)
    }

    /// Drop `id` and everything stacked above it
    pub fn discard(&mut self, id: PlanId) -> Result<usize> {
        let index = self.position(id)?;
        if index == 0 {
            return Err(StepError::BasePlan(self.thread));
        }
        let dropped = self.entries.len() - index;
        self.entries.truncate(index);
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::RunToAddressPlan;

    fn run_to(addr: u64) -> Box<dyn ThreadPlan> {
        Box::new(RunToAddressPlan::new(ThreadId(1), vec![addr], false))
    }

    #[test]
    fn test_base_plan_is_permanent() {
        let mut stack = PlanStack::new(ThreadId(1));
        assert!(stack.base_is_top());
        assert_eq!(stack.top().plan.kind(), PlanKind::Base);
        assert!(stack.pop().is_none());

        let base = stack.ids()[0];
        let err = stack.discard(base).unwrap_err();
        assert!(matches!(err, StepError::BasePlan(ThreadId(1))));
    }

    #[test]
    fn test_push_pop_order() {
        let mut stack = PlanStack::new(ThreadId(1));
        let first = stack.push(run_to(0x10), true);
        let second = stack.push(run_to(0x20), false);
        assert_eq!(stack.depth(), 3);
        assert_eq!(&stack.ids()[1..], &[first, second]);

        let popped = stack.pop().unwrap();
        assert_eq!(popped.plan.id(), second);
        assert!(!popped.controlling);
        assert_eq!(stack.top().plan.id(), first);
    }

    #[test]
    fn test_discard() {
        let mut stack = PlanStack::new(ThreadId(1));
        let first = stack.push(run_to(0x10), true);
        stack.push(run_to(0x20), false);
        stack.push(run_to(0x30), false);

        assert_eq!(stack.discard_above(first).unwrap(), 2);
        assert_eq!(stack.top().plan.id(), first);

        assert_eq!(stack.discard(first).unwrap(), 1);
        assert!(stack.base_is_top());
        assert!(stack.get(first).is_none());

        let err = stack.discard(first).unwrap_err();
        assert!(matches!(err, StepError::UnknownPlan { .. }));
    }

    #[test]
    fn test_infos() {
        let mut stack = PlanStack::new(ThreadId(1));
        stack.push(run_to(0x10), true);
        let infos = stack.infos();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].kind, PlanKind::RunToAddress);
        assert_eq!(infos[1].description, "run to address: 0x10");
        assert!(infos[1].controlling);
    }
}
