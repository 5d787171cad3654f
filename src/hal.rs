//! External-interface boundary (§6): the CPU, the MMU, the I/O bus and the
//! program loader. The kernel never touches simulated hardware directly —
//! it only calls these traits. Production embedders implement them against
//! the real simulator; tests implement them against in-memory fakes.

use crate::error::KernelError;
use crate::memory::FrameId;

/// One of the four terminals a process can be routed to (§4.6 assignment
/// rule: `(pid - 1) mod 4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    A,
    B,
    C,
    D,
}

impl Terminal {
    pub fn from_index(index: usize) -> Self {
        match index % 4 {
            0 => Terminal::A,
            1 => Terminal::B,
            2 => Terminal::C,
            _ => Terminal::D,
        }
    }
}

/// Fault condition observed in the saved `ERR` register (§3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuFault {
    None,
    PageAbsent,
    InvalidAddress,
    IllegalInstruction,
    PrivilegeViolation,
}

/// The CPU's save area: `PC, A, ERR, COMPLEMENT` plus `X` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SavedContext {
    pub pc: i64,
    pub a: i64,
    pub x: i64,
    pub err: CpuFault,
    pub complement: i64,
}

impl Default for CpuFault {
    fn default() -> Self {
        CpuFault::None
    }
}

/// CPU boundary: read/write the fixed save-area cells (§6).
pub trait Cpu {
    fn read_save_area(&self) -> Result<SavedContext, KernelError>;
    fn write_save_area(&mut self, ctx: &SavedContext) -> Result<(), KernelError>;
}

/// MMU boundary (§6): binding an address space for the dispatched
/// process's own subsequent user-mode execution, and the temporary
/// cross-address-space read used by `CRIA_PROC`'s string copy (§4.6,
/// §9 — "a first-class primitive: with another process's address space
/// do X"). `read_via` takes the source table directly rather than
/// mutating a hidden "currently bound" slot, since the only call site
/// reads and discards within a single syscall.
pub trait Mmu {
    fn bind_current(&mut self, table: Option<&mut dyn crate::memory::PageTable>);
    fn read_via(&self, table: &dyn crate::memory::PageTable, vaddr: u64) -> Result<u8, KernelError>;
}

/// I/O bus boundary (§6): per-terminal keyboard/screen registers plus the
/// clock's instruction counter and timer.
pub trait IoBus {
    fn keyboard_ready(&self, term: Terminal) -> bool;
    fn keyboard_read(&mut self, term: Terminal) -> Result<i64, KernelError>;
    fn screen_ready(&self, term: Terminal) -> bool;
    fn screen_write(&mut self, term: Terminal, value: i64) -> Result<(), KernelError>;
    /// Monotonic instruction-count register.
    fn now(&self) -> u64;
    fn arm_timer(&mut self, ticks: u64) -> Result<(), KernelError>;
    fn clear_timer_interrupt(&mut self) -> Result<(), KernelError>;
}

/// Loader boundary (§6): load address, length, and page fill. Byte-level
/// random access is folded into `load_page` since the fill destination
/// (a physical frame) is itself out of scope — the loader is the only
/// component that needs to know both the executable's bytes and how to
/// place them in a frame, zero-filling past `valid_len`.
pub trait ProgramLoader {
    fn load_address(&self, name: &str) -> Result<u64, KernelError>;
    fn length(&self, name: &str) -> Result<u64, KernelError>;
    fn load_page(
        &self,
        name: &str,
        file_offset: u64,
        frame: FrameId,
        page_size: u64,
        valid_len: u64,
    ) -> Result<(), KernelError>;
}
