//! Fallible boundaries of the kernel. `Kernel::on_interrupt` itself never
//! returns `Result` (per spec, every failure folds into the latched
//! `internal_error`), but the plumbing underneath — save-area access,
//! loader I/O, cross-address-space string copy — follows normal Rust
//! error propagation and is folded at the call site.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum KernelError {
    #[error("failed to read the CPU save area")]
    SaveAreaReadFailed,
    #[error("failed to write the CPU save area")]
    SaveAreaWriteFailed,
    #[error("device bus error on terminal access")]
    DeviceBusError,
    #[error("failed to program the clock timer")]
    TimerProgrammingFailed,
    #[error("program '{0}' could not be loaded")]
    LoaderFailed(String),
    #[error("page table creation failed")]
    PageTableCreationFailed,
    #[error("string copy from process address space aborted")]
    StringCopyAborted,
    #[error("unrecognized IRQ kind")]
    UnknownIrq,
}
