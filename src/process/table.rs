//! Fixed-capacity process table (§3: `MAX_PROCESSES` slots). Table-slot
//! indices are an internal allocator concern — callers outside this
//! module address processes by `Pid` only (§9).

use super::{Pcb, Pid};

pub struct ProcessTable {
    slots: Vec<Pcb>,
    next_pid: u32,
}

impl ProcessTable {
    pub fn new(capacity: usize, now: u64) -> Self {
        ProcessTable {
            slots: (0..capacity).map(|_| Pcb::free(now)).collect(),
            next_pid: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, idx: usize) -> &Pcb {
        &self.slots[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Pcb {
        &mut self.slots[idx]
    }

    pub fn slots(&self) -> &[Pcb] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Pcb] {
        &mut self.slots
    }

    /// Finds a free slot without mutating the table (§4.6: a full table
    /// makes `CRIA_PROC` fail before any side effect is committed).
    pub fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Pcb::is_free)
    }

    pub fn index_of_pid(&self, pid: Pid) -> Option<usize> {
        self.slots.iter().position(|p| p.pid == Some(pid))
    }

    pub fn is_live(&self, idx: usize) -> bool {
        idx < self.slots.len() && self.slots[idx].pid.is_some()
    }

    /// Allocates the next PID. Monotonic and never reused within a run,
    /// matching the original allocator (§3, §8 law: "next PID advanced"
    /// survives a create-then-kill cycle).
    pub fn allocate_pid(&mut self) -> Pid {
        let pid = Pid(self.next_pid);
        self.next_pid += 1;
        pid
    }

    pub fn install(&mut self, idx: usize, pcb: Pcb) {
        self.slots[idx] = pcb;
    }

    pub fn free_slot(&mut self, idx: usize, now: u64) {
        self.slots[idx] = Pcb::free(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_slots_start_free() {
        let table = ProcessTable::new(3, 0);
        assert_eq!(table.find_free_slot(), Some(0));
        assert!((0..3).all(|i| table.get(i).is_free()));
    }

    #[test]
    fn pid_allocation_is_monotonic_and_never_reused() {
        let mut table = ProcessTable::new(3, 0);
        let first = table.allocate_pid();
        let second = table.allocate_pid();
        assert_eq!(first, Pid(1));
        assert_eq!(second, Pid(2));
    }
}
