//! The "one kernel record" of §9: every entry point takes `&mut Kernel`,
//! there is no ambient singleton. `on_interrupt` is the single trap entry
//! and runs the fixed pipeline of §4.1: SaveContext -> HandleIRQ ->
//! ServicePending -> Schedule -> Dispatch.

use crate::config::Config;
use crate::error::KernelError;
use crate::hal::{Cpu, IoBus, Mmu, ProgramLoader};
use crate::irq::Irq;
use crate::memory::replacement::ReplacementPolicy;
use crate::memory::{FrameTable, PageTableFactory};
use crate::process::metrics::StateBucket;
use crate::process::table::ProcessTable;
use crate::process::{BlockReason, ProcessState};
use crate::scheduler::SchedulerPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Resume,
    Halt,
}

pub struct Kernel {
    pub(crate) cfg: Config,
    pub(crate) cpu: Box<dyn Cpu>,
    pub(crate) io: Box<dyn IoBus>,
    pub(crate) mmu: Box<dyn Mmu>,
    pub(crate) loader: Box<dyn ProgramLoader>,
    pub(crate) page_tables: Box<dyn PageTableFactory>,
    pub(crate) table: ProcessTable,
    pub(crate) scheduler: Box<dyn SchedulerPolicy>,
    pub(crate) replacement: Box<dyn ReplacementPolicy>,
    pub(crate) frames: FrameTable,
    pub(crate) current_idx: Option<usize>,
    pub(crate) quantum_left: u32,
    pub(crate) disk_free_time: u64,
    pub(crate) idle_time: u64,
    pub(crate) preemptions_total: u64,
    pub(crate) irq_counts: [u64; Irq::COUNT],
    pub(crate) internal_error: bool,
}

impl Kernel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: Config,
        cpu: Box<dyn Cpu>,
        io: Box<dyn IoBus>,
        mmu: Box<dyn Mmu>,
        loader: Box<dyn ProgramLoader>,
        page_tables: Box<dyn PageTableFactory>,
        scheduler: Box<dyn SchedulerPolicy>,
        replacement: Box<dyn ReplacementPolicy>,
    ) -> Self {
        let max_processes = cfg.max_processes;
        let max_frames = cfg.max_frames;
        let reserved_frames = cfg.reserved_frames;
        Kernel {
            cfg,
            cpu,
            io,
            mmu,
            loader,
            page_tables,
            table: ProcessTable::new(max_processes, 0),
            scheduler,
            replacement,
            frames: FrameTable::new(max_frames, reserved_frames),
            current_idx: None,
            quantum_left: 0,
            disk_free_time: 0,
            idle_time: 0,
            preemptions_total: 0,
            irq_counts: [0; Irq::COUNT],
            internal_error: false,
        }
    }

    pub fn internal_error(&self) -> bool {
        self.internal_error
    }

    pub fn irq_count(&self, irq: Irq) -> u64 {
        self.irq_counts[irq.index()]
    }

    pub fn idle_time(&self) -> u64 {
        self.idle_time
    }

    pub fn preemptions_total(&self) -> u64 {
        self.preemptions_total
    }

    pub fn process_table(&self) -> &ProcessTable {
        &self.table
    }

    /// The single trap entry (§2, §4.1). Never panics on a user-level
    /// condition: every internal failure instead latches `internal_error`,
    /// which forces `Halt` on this and every subsequent call.
    pub fn on_interrupt(&mut self, irq: Irq) -> DispatchResult {
        self.irq_counts[irq.index()] += 1;

        if self.internal_error {
            return DispatchResult::Halt;
        }

        self.save_context();
        self.handle_irq(irq);
        self.service_pending();
        let next = self.schedule();
        self.dispatch(next)
    }

    pub(crate) fn fail(&mut self, err: KernelError) {
        log::error!("internal kernel error, latching halt: {err}");
        self.internal_error = true;
    }

    /// §4.1 step 2: if a process is RUNNING, snapshot its CPU context
    /// into its PCB, update timing/priority accounting, and demote it to
    /// READY. After this call, no PCB anywhere is RUNNING.
    fn save_context(&mut self) {
        let Some(idx) = self.current_idx else {
            return;
        };

        let ctx = match self.cpu.read_save_area() {
            Ok(ctx) => ctx,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let now = self.io.now();
        let quantum = self.cfg.quantum as f64;
        let tick_interval = self.cfg.tick_interval as f64;

        let pcb = self.table.get_mut(idx);
        pcb.context = ctx;
        let exec_ratio = (now.saturating_sub(pcb.last_dispatch_time)) as f64 / (quantum * tick_interval);
        pcb.priority = (pcb.priority + exec_ratio) / 2.0;
        pcb.metrics.enter_state(StateBucket::Running, now);
        pcb.state = ProcessState::Ready;
    }

    /// Blocks the PCB at `idx` for `reason`, closing out its READY bucket
    /// (it was demoted READY by `save_context` just before the syscall
    /// or fault that leads here decided to block it).
    pub(crate) fn block(&mut self, idx: usize, reason: BlockReason, now: u64) {
        let pcb = self.table.get_mut(idx);
        pcb.metrics.enter_state(StateBucket::Ready, now);
        pcb.state = ProcessState::Blocked(reason);
    }

    /// Transitions a BLOCKED PCB back to READY and enqueues it under RR
    /// (§4.3 — shared by the read/write/wait-proc/paging unblock paths).
    pub(crate) fn unblock(&mut self, idx: usize, now: u64) {
        let pcb = self.table.get_mut(idx);
        pcb.metrics.enter_state(StateBucket::Blocked, now);
        pcb.metrics.last_unblock_time = Some(now);
        pcb.state = ProcessState::Ready;
        self.scheduler.enqueue_ready(idx);
    }

    /// §4.6 `MATA_PROC` / §4.7 segfault path: tear down the PCB, release
    /// its frames, wake every `WAIT_PROC` waiter.
    pub(crate) fn kill_process(&mut self, idx: usize, now: u64) {
        let dead_pid = self.table.get(idx).pid;

        for i in 0..self.table.len() {
            if i == idx {
                continue;
            }
            let waiting_for_dead = matches!(self.table.get(i).state, ProcessState::Blocked(BlockReason::WaitProc))
                && self.table.get(i).pid_waited == dead_pid;
            if waiting_for_dead {
                self.table.get_mut(i).context.a = 0;
                self.table.get_mut(i).pid_waited = None;
                self.unblock(i, now);
            }
        }

        let owned = self.frames.owned_by(idx);
        for frame in owned {
            self.frames.release(frame);
            self.replacement.on_frame_released(frame);
        }

        let bucket = match self.table.get(idx).state {
            ProcessState::Ready => StateBucket::Ready,
            ProcessState::Running => StateBucket::Running,
            ProcessState::Blocked(_) => StateBucket::Blocked,
            ProcessState::Terminated => StateBucket::Ready,
        };

        let pcb = self.table.get_mut(idx);
        pcb.metrics.terminate(bucket, now);
        pcb.state = ProcessState::Terminated;
        pcb.page_table = None;
        pcb.pid = None;

        if self.current_idx == Some(idx) {
            self.current_idx = None;
        }
    }

    /// §4.3 Pending-Event Service: table-index ascending, one pass per
    /// interrupt, independent of which IRQ fired.
    fn service_pending(&mut self) {
        let now = self.io.now();
        for idx in 0..self.table.len() {
            let (pid, reason) = match self.table.get(idx).state {
                ProcessState::Blocked(reason) => (self.table.get(idx).pid, reason),
                _ => continue,
            };
            if pid.is_none() {
                continue;
            }
            match reason {
                BlockReason::ReadIo => self.service_read_io(idx, now),
                BlockReason::WriteIo => self.service_write_io(idx, now),
                BlockReason::WaitProc => self.service_wait_proc(idx, now),
                BlockReason::Paging => self.service_paging(idx, now),
            }
        }
    }

    fn service_read_io(&mut self, idx: usize, now: u64) {
        let term = self.table.get(idx).in_dev;
        if !self.io.keyboard_ready(term) {
            return;
        }
        match self.io.keyboard_read(term) {
            Ok(datum) => {
                self.table.get_mut(idx).context.a = datum;
                self.unblock(idx, now);
            }
            Err(e) => self.fail(e),
        }
    }

    fn service_write_io(&mut self, idx: usize, now: u64) {
        let term = self.table.get(idx).out_dev;
        if !self.io.screen_ready(term) {
            return;
        }
        let value = self.table.get(idx).context.x;
        match self.io.screen_write(term, value) {
            Ok(()) => {
                self.table.get_mut(idx).context.a = 0;
                self.unblock(idx, now);
            }
            Err(e) => self.fail(e),
        }
    }

    fn service_wait_proc(&mut self, idx: usize, now: u64) {
        let target = self.table.get(idx).pid_waited;
        let target_alive = target.is_some_and(|pid| self.table.index_of_pid(pid).is_some());
        if target_alive {
            return;
        }
        self.table.get_mut(idx).context.a = 0;
        self.table.get_mut(idx).pid_waited = None;
        self.unblock(idx, now);
    }

    fn service_paging(&mut self, idx: usize, now: u64) {
        if now < self.table.get(idx).disk_io_eta {
            return;
        }
        // PC is left exactly where the fault occurred; the instruction retries.
        self.unblock(idx, now);
    }

    /// §4.4/§4.5: select the next process, apply the shared quantum-reset
    /// rule, and bump preemption counters when the policy reports one.
    fn schedule(&mut self) -> Option<usize> {
        let quantum_left = self.quantum_left;
        let decision = self.scheduler.pick_next(&self.table, self.current_idx, quantum_left);

        if decision.preempted {
            if let Some(prev) = self.current_idx {
                self.table.get_mut(prev).metrics.preemptions += 1;
            }
            self.preemptions_total += 1;
        }

        if decision.next != self.current_idx || quantum_left == 0 {
            self.quantum_left = self.cfg.quantum;
        }

        self.current_idx = decision.next;
        self.current_idx
    }

    /// §4.5 Dispatcher.
    fn dispatch(&mut self, next: Option<usize>) -> DispatchResult {
        if self.internal_error {
            self.mmu.bind_current(None);
            return DispatchResult::Halt;
        }

        let Some(idx) = next else {
            self.mmu.bind_current(None);
            return DispatchResult::Halt;
        };

        let now = self.io.now();
        let ctx = self.table.get(idx).context;

        self.mmu.bind_current(self.table.get_mut(idx).page_table.as_deref_mut());
        if let Err(e) = self.cpu.write_save_area(&ctx) {
            self.fail(e);
            return DispatchResult::Halt;
        }

        let pcb = self.table.get_mut(idx);
        pcb.metrics.enter_state(StateBucket::Ready, now);
        pcb.metrics.record_response(now);
        pcb.state = ProcessState::Running;
        pcb.last_dispatch_time = now;

        DispatchResult::Resume
    }
}
