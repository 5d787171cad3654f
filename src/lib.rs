//! Supervisor core of a simulated computer: process table, the two
//! pluggable scheduling policies, and demand-paged virtual memory built
//! around an interrupt-driven kernel loop (`SaveContext -> HandleIRQ ->
//! ServicePending -> Schedule -> Dispatch`).
//!
//! The kernel never touches simulated hardware directly; it is generic
//! over the `hal` boundary traits (`Cpu`, `Mmu`, `IoBus`, `ProgramLoader`,
//! `PageTable`). Everything here is single-threaded and re-entered only
//! through `Kernel::on_interrupt`.

pub mod config;
pub mod error;
pub mod hal;
pub mod irq;
pub mod kernel;
pub mod memory;
pub mod process;
pub mod scheduler;
pub mod syscall;

pub use config::Config;
pub use error::KernelError;
pub use irq::Irq;
pub use kernel::{DispatchResult, Kernel};
