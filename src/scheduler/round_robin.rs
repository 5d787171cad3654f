//! Round-Robin: a ring buffer of READY indices, capacity `MAX_PROCESSES`
//! (§4.4). Preemption is counted elsewhere (CLOCK quantum decay), so this
//! policy's decisions never report `preempted: true`.

use super::{SchedulerPolicy, SchedulingDecision};
use crate::process::table::ProcessTable;
use crate::process::ProcessState;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct RoundRobin {
    ring: VecDeque<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        RoundRobin::default()
    }
}

impl SchedulerPolicy for RoundRobin {
    fn enqueue_ready(&mut self, idx: usize) {
        if !self.ring.contains(&idx) {
            self.ring.push_back(idx);
        }
    }

    fn pick_next(
        &mut self,
        table: &ProcessTable,
        previous: Option<usize>,
        quantum_left: u32,
    ) -> SchedulingDecision {
        let previous_ready = previous.is_some_and(|idx| table.get(idx).state == ProcessState::Ready);

        if previous_ready && quantum_left > 0 {
            return SchedulingDecision {
                next: previous,
                preempted: false,
            };
        }

        if previous_ready {
            self.ring.push_back(previous.unwrap());
        }

        let next = self.ring.pop_front();
        SchedulingDecision {
            next,
            preempted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_ready(n: usize) -> ProcessTable {
        let mut table = ProcessTable::new(n, 0);
        for i in 0..n {
            table.get_mut(i).state = ProcessState::Ready;
            table.get_mut(i).pid = Some(crate::process::Pid((i + 1) as u32));
        }
        table
    }

    #[test]
    fn current_keeps_cpu_while_quantum_remains() {
        let table = table_with_ready(2);
        let mut rr = RoundRobin::new();
        rr.enqueue_ready(0);
        rr.enqueue_ready(1);
        let decision = rr.pick_next(&table, Some(0), 1);
        assert_eq!(decision.next, Some(0));
        assert!(!decision.preempted);
    }

    #[test]
    fn rotates_strictly_fifo_on_quantum_expiry() {
        let table = table_with_ready(3);
        let mut rr = RoundRobin::new();
        rr.enqueue_ready(0);
        rr.enqueue_ready(1);
        rr.enqueue_ready(2);
        // 0 is dispatched first by popping the head.
        let d0 = rr.pick_next(&table, None, 0);
        assert_eq!(d0.next, Some(0));
        let d1 = rr.pick_next(&table, Some(0), 0);
        assert_eq!(d1.next, Some(1));
        let d2 = rr.pick_next(&table, Some(1), 0);
        assert_eq!(d2.next, Some(2));
        let d3 = rr.pick_next(&table, Some(2), 0);
        assert_eq!(d3.next, Some(0));
    }

    #[test]
    fn halts_when_ring_is_empty() {
        let table = ProcessTable::new(1, 0);
        let mut rr = RoundRobin::new();
        let decision = rr.pick_next(&table, None, 0);
        assert_eq!(decision.next, None);
    }
}
