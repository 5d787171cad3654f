//! IRQ kinds and their handlers (§4.2), dispatched from `Kernel::on_interrupt`.

use crate::config::SchedulerKind;
use crate::hal::{CpuFault, Terminal};
use crate::kernel::Kernel;
use crate::memory::replacement::ReplacementPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Irq {
    Reset,
    Syscall,
    CpuError,
    Clock,
    Unknown,
}

impl Irq {
    pub const COUNT: usize = 5;

    pub fn index(self) -> usize {
        match self {
            Irq::Reset => 0,
            Irq::Syscall => 1,
            Irq::CpuError => 2,
            Irq::Clock => 3,
            Irq::Unknown => 4,
        }
    }
}

impl Kernel {
    pub(crate) fn handle_irq(&mut self, irq: Irq) {
        match irq {
            Irq::Reset => self.handle_reset(),
            Irq::Syscall => self.handle_syscall_irq(),
            Irq::CpuError => self.handle_cpu_error(),
            Irq::Clock => self.handle_clock(),
            Irq::Unknown => {
                log::error!("unknown IRQ received");
                self.fail(crate::error::KernelError::UnknownIrq);
            }
        }
    }

    /// Fires once at boot: arm the clock, eagerly load PID 1 (`init`)
    /// with every page resident (§4.2).
    fn handle_reset(&mut self) {
        if let Err(e) = self.io.arm_timer(self.cfg.tick_interval) {
            self.fail(e);
            return;
        }

        let now = self.io.now();
        let name = "init".to_string();

        let Some(new_idx) = self.table.find_free_slot() else {
            self.fail_boot("process table full while loading init");
            return;
        };

        let pid = self.table.allocate_pid();

        let load_addr = match self.loader.load_address(&name) {
            Ok(v) => v,
            Err(e) => {
                self.fail(e);
                return;
            }
        };
        let length = match self.loader.length(&name) {
            Ok(v) => v,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let mut page_table = self.page_tables.create();
        let n_pages = length.div_ceil(self.cfg.page_size);

        for page in 0..n_pages {
            let Some(frame) = self.frames.take_fresh_frame() else {
                self.fail_boot("out of frames while loading init eagerly");
                return;
            };
            self.replacement.on_frame_allocated(frame);
            if let Err(e) = self.fill_page(&name, load_addr, length, page, frame) {
                self.fail(e);
                return;
            }
            self.frames.set_owner(frame, new_idx, page);
            page_table.map(page, frame);
        }

        let terminal = Terminal::from_index(0);
        let pcb = crate::process::Pcb::new(pid, page_table, name, length, terminal, now);
        self.table.install(new_idx, pcb);
        self.scheduler.enqueue_ready(new_idx);
    }

    fn fail_boot(&mut self, msg: &str) {
        log::error!("{msg}");
        self.internal_error = true;
    }

    /// The running PCB's A register carries the syscall ID (§4.6).
    fn handle_syscall_irq(&mut self) {
        let Some(idx) = self.current_idx else {
            log::warn!("SYSCALL IRQ with no current process");
            return;
        };
        self.dispatch_syscall(idx);
    }

    /// §4.2 CPU_ERROR: page faults are serviced; everything else kills
    /// the offending process.
    fn handle_cpu_error(&mut self) {
        let Some(idx) = self.current_idx else {
            log::warn!("CPU_ERROR IRQ with no current process");
            return;
        };
        let now = self.io.now();
        match self.table.get(idx).context.err {
            CpuFault::PageAbsent => self.handle_page_fault(idx),
            CpuFault::None => {}
            fault => {
                log::warn!("pid slot {idx} killed by CPU error: {fault:?}");
                self.kill_process(idx, now);
            }
        }
    }

    /// §4.2 CLOCK: re-arm the timer, run LRU aging if active, account
    /// idle time, and — under Round-Robin only — decrement the shared
    /// quantum counter and count a decay preemption. Priority has its own,
    /// mutually exclusive preemption rule (counted in `schedule()` on
    /// selection change, §4.4); stacking the two would double-count.
    fn handle_clock(&mut self) {
        if let Err(e) = self.io.clear_timer_interrupt() {
            self.fail(e);
            return;
        }
        if let Err(e) = self.io.arm_timer(self.cfg.tick_interval) {
            self.fail(e);
            return;
        }

        match self.current_idx {
            Some(idx) => {
                let pt = self.table.get_mut(idx).page_table.as_deref_mut();
                if let Some(pt) = pt {
                    self.replacement.on_clock_tick(&mut self.frames, idx, pt);
                }
            }
            None => {
                self.idle_time += self.cfg.tick_interval;
            }
        }

        if self.cfg.scheduler == SchedulerKind::RoundRobin {
            if self.quantum_left > 0 {
                self.quantum_left -= 1;
            }
            if self.quantum_left == 0 {
                if let Some(idx) = self.current_idx {
                    self.table.get_mut(idx).metrics.preemptions += 1;
                    self.preemptions_total += 1;
                }
            }
        }
    }
}
