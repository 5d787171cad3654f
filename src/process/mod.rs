//! Process table, state machine and per-process record (§3, §9).

pub mod metrics;
pub mod table;

use crate::hal::{SavedContext, Terminal};
use crate::memory::PageTable;
use metrics::ProcessMetrics;

/// Stable, opaque process identity. PIDs are assigned monotonically from
/// 1; PID 0 is reserved as the "self" sentinel used by `MATA_PROC` (§3,
/// §9 — external callers refer to PIDs, never table-slot indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

/// Why a PCB is `BLOCKED` (§3). Folded into `ProcessState::Blocked` so
/// `block_reason != NONE` while not blocked is unrepresentable (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    ReadIo,
    WriteIo,
    WaitProc,
    Paging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked(BlockReason),
    Terminated,
}

/// Process Control Block. One per table slot; a slot is free iff
/// `pid.is_none() && state == Terminated`.
pub struct Pcb {
    pub pid: Option<Pid>,
    pub state: ProcessState,
    pub context: SavedContext,
    pub in_dev: Terminal,
    pub out_dev: Terminal,
    pub pid_waited: Option<Pid>,
    pub priority: f64,
    pub page_table: Option<Box<dyn PageTable>>,
    pub exe_name: String,
    pub mem_size: u64,
    pub disk_io_eta: u64,
    pub page_faults: u64,
    pub last_dispatch_time: u64,
    pub metrics: ProcessMetrics,
}

impl Pcb {
    pub fn free(now: u64) -> Self {
        Pcb {
            pid: None,
            state: ProcessState::Terminated,
            context: SavedContext::default(),
            in_dev: Terminal::A,
            out_dev: Terminal::A,
            pid_waited: None,
            priority: 0.5,
            page_table: None,
            exe_name: String::new(),
            mem_size: 0,
            disk_io_eta: 0,
            page_faults: 0,
            last_dispatch_time: 0,
            metrics: ProcessMetrics::new(now),
        }
    }

    pub fn is_free(&self) -> bool {
        self.pid.is_none() && matches!(self.state, ProcessState::Terminated)
    }

    pub fn new(
        pid: Pid,
        page_table: Box<dyn PageTable>,
        exe_name: String,
        mem_size: u64,
        terminal: Terminal,
        now: u64,
    ) -> Self {
        Pcb {
            pid: Some(pid),
            state: ProcessState::Ready,
            context: SavedContext::default(),
            in_dev: terminal,
            out_dev: terminal,
            pid_waited: None,
            priority: 0.5,
            page_table: Some(page_table),
            exe_name,
            mem_size,
            disk_io_eta: 0,
            page_faults: 0,
            last_dispatch_time: now,
            metrics: ProcessMetrics::new(now),
        }
    }
}
