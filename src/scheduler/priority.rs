//! Priority: no queue, scans the table for the READY PCB with the
//! smallest `priority` (ties broken by lowest table index) (§4.4).
//! `priority` itself is updated at context-save, not here.

use super::{SchedulerPolicy, SchedulingDecision};
use crate::process::table::ProcessTable;
use crate::process::ProcessState;

#[derive(Debug, Default)]
pub struct Priority;

impl Priority {
    pub fn new() -> Self {
        Priority
    }
}

impl SchedulerPolicy for Priority {
    fn enqueue_ready(&mut self, _idx: usize) {
        // No queue to maintain; pick_next re-scans the table every time.
    }

    fn pick_next(
        &mut self,
        table: &ProcessTable,
        previous: Option<usize>,
        _quantum_left: u32,
    ) -> SchedulingDecision {
        let next = table
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, pcb)| pcb.state == ProcessState::Ready)
            .min_by(|(ia, a), (ib, b)| {
                a.priority
                    .partial_cmp(&b.priority)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(ia.cmp(ib))
            })
            .map(|(idx, _)| idx);

        let previous_ready = previous.is_some_and(|idx| table.get(idx).state == ProcessState::Ready);
        let preempted = previous_ready && next != previous;

        SchedulingDecision { next, preempted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Pid;

    fn table_with_priorities(priorities: &[f64]) -> ProcessTable {
        let mut table = ProcessTable::new(priorities.len(), 0);
        for (i, p) in priorities.iter().enumerate() {
            let pcb = table.get_mut(i);
            pcb.state = ProcessState::Ready;
            pcb.pid = Some(Pid((i + 1) as u32));
            pcb.priority = *p;
        }
        table
    }

    #[test]
    fn picks_smallest_priority_breaking_ties_by_index() {
        let table = table_with_priorities(&[0.5, 0.2, 0.2]);
        let mut sched = Priority::new();
        let decision = sched.pick_next(&table, None, 0);
        assert_eq!(decision.next, Some(1));
    }

    #[test]
    fn counts_preemption_only_on_selection_change() {
        let table = table_with_priorities(&[0.5, 0.1]);
        let mut sched = Priority::new();
        let decision = sched.pick_next(&table, Some(0), 0);
        assert_eq!(decision.next, Some(1));
        assert!(decision.preempted);

        let table_same = table_with_priorities(&[0.1, 0.5]);
        let decision_same = sched.pick_next(&table_same, Some(0), 0);
        assert_eq!(decision_same.next, Some(0));
        assert!(!decision_same.preempted);
    }
}
