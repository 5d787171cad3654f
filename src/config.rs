//! Build-time selectors of the original simulator become runtime
//! constructor arguments here — there is no persisted configuration file
//! and no CLI layer (both out of scope), so a plain struct is enough.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    RoundRobin,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementKind {
    Fifo,
    LruAging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub scheduler: SchedulerKind,
    pub replacement: ReplacementKind,
    /// Instructions per CLOCK IRQ.
    pub tick_interval: u64,
    /// Clock ticks a process may run before forced reschedule under RR.
    pub quantum: u32,
    pub max_processes: usize,
    /// Instruction-time cost of one simulated page transfer.
    pub disk_transfer: u64,
    pub page_size: u64,
    pub max_frames: usize,
    /// Frames [0, reserved_frames) are boot/ROM and never enter replacement.
    pub reserved_frames: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scheduler: SchedulerKind::RoundRobin,
            replacement: ReplacementKind::Fifo,
            tick_interval: 10,
            quantum: 2,
            max_processes: 10,
            disk_transfer: 100,
            page_size: 8,
            max_frames: 4,
            reserved_frames: 0,
        }
    }
}
