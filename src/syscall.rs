//! The five syscalls (§4.6), decoded from the running PCB's saved A
//! register and dispatched from the `SYSCALL` IRQ handler.

use crate::hal::Terminal;
use crate::kernel::Kernel;
use crate::process::{BlockReason, Pcb, Pid};

const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyscallId {
    Le,
    Escr,
    CriaProc,
    MataProc,
    EsperaProc,
}

impl SyscallId {
    fn from_register(a: i64) -> Option<Self> {
        match a {
            1 => Some(SyscallId::Le),
            2 => Some(SyscallId::Escr),
            3 => Some(SyscallId::CriaProc),
            4 => Some(SyscallId::MataProc),
            5 => Some(SyscallId::EsperaProc),
            _ => None,
        }
    }
}

impl Kernel {
    pub(crate) fn dispatch_syscall(&mut self, idx: usize) {
        let a = self.table.get(idx).context.a;
        match SyscallId::from_register(a) {
            Some(SyscallId::Le) => self.sys_le(idx),
            Some(SyscallId::Escr) => self.sys_escr(idx),
            Some(SyscallId::CriaProc) => self.sys_cria_proc(idx),
            Some(SyscallId::MataProc) => self.sys_mata_proc(idx),
            Some(SyscallId::EsperaProc) => self.sys_espera_proc(idx),
            None => {
                log::warn!("unknown syscall id {a} from pid slot {idx}, killing");
                let now = self.io.now();
                self.kill_process(idx, now);
            }
        }
    }

    fn sys_le(&mut self, idx: usize) {
        let now = self.io.now();
        let term = self.table.get(idx).in_dev;
        if !self.io.keyboard_ready(term) {
            self.block(idx, BlockReason::ReadIo, now);
            return;
        }
        match self.io.keyboard_read(term) {
            Ok(datum) => self.table.get_mut(idx).context.a = datum,
            Err(e) => {
                self.table.get_mut(idx).context.a = -1;
                self.fail(e);
            }
        }
    }

    fn sys_escr(&mut self, idx: usize) {
        let now = self.io.now();
        let term = self.table.get(idx).out_dev;
        if !self.io.screen_ready(term) {
            self.block(idx, BlockReason::WriteIo, now);
            return;
        }
        let value = self.table.get(idx).context.x;
        match self.io.screen_write(term, value) {
            Ok(()) => self.table.get_mut(idx).context.a = 0,
            Err(e) => {
                self.table.get_mut(idx).context.a = -1;
                self.fail(e);
            }
        }
    }

    fn sys_cria_proc(&mut self, idx: usize) {
        let now = self.io.now();
        let name_addr = self.table.get(idx).context.x;

        let name = match self.copy_cstring_from(idx, name_addr as u64) {
            Ok(name) => name,
            Err(_) => {
                self.table.get_mut(idx).context.a = -1;
                return;
            }
        };

        let Some(new_idx) = self.table.find_free_slot() else {
            self.table.get_mut(idx).context.a = -1;
            return;
        };

        let load_addr = match self.loader.load_address(&name) {
            Ok(v) => v,
            Err(_) => {
                self.table.get_mut(idx).context.a = -1;
                return;
            }
        };
        let length = match self.loader.length(&name) {
            Ok(v) => v,
            Err(_) => {
                self.table.get_mut(idx).context.a = -1;
                return;
            }
        };

        let page_table = self.page_tables.create();
        let pid = self.table.allocate_pid();
        let terminal = Terminal::from_index(((pid.0 - 1) % 4) as usize);

        let pcb = Pcb::new(pid, page_table, name, length, terminal, now);
        self.table.install(new_idx, pcb);
        self.scheduler.enqueue_ready(new_idx);

        let _ = load_addr; // metadata only; pages are demand-paged from here on
        self.table.get_mut(idx).context.a = pid.0 as i64;
    }

    fn sys_mata_proc(&mut self, idx: usize) {
        let now = self.io.now();
        let x = self.table.get(idx).context.x;

        // §9 open question: target 0 resolves to whichever PCB is
        // currently bound to the CPU, which at this point is `idx`.
        let target_idx = if x == 0 {
            Some(idx)
        } else {
            self.table.index_of_pid(Pid(x as u32))
        };

        match target_idx.filter(|&t| self.table.is_live(t)) {
            Some(target) => {
                self.kill_process(target, now);
                self.table.get_mut(idx).context.a = 0;
            }
            None => {
                self.table.get_mut(idx).context.a = -1;
            }
        }
    }

    fn sys_espera_proc(&mut self, idx: usize) {
        let now = self.io.now();
        let x = self.table.get(idx).context.x;
        let target = Pid(x as u32);

        let is_self = self.table.get(idx).pid == Some(target);
        let target_alive = !is_self && self.table.index_of_pid(target).is_some();

        if is_self || !target_alive {
            self.table.get_mut(idx).context.a = -1;
            return;
        }

        self.table.get_mut(idx).pid_waited = Some(target);
        self.block(idx, BlockReason::WaitProc, now);
    }

    /// §4.6 string copy: reads through the caller's own page table (the
    /// source is always the running process reading its own resident
    /// code pages — the only call site per §9). Aborts on an MMU error
    /// or a name longer than is plausible for a `.maq` file name.
    fn copy_cstring_from(&mut self, idx: usize, vaddr: u64) -> Result<String, crate::error::KernelError> {
        let Some(page_table) = self.table.get(idx).page_table.as_deref() else {
            return Err(crate::error::KernelError::StringCopyAborted);
        };

        let mut bytes = Vec::new();
        let mut addr = vaddr;
        loop {
            let byte = self
                .mmu
                .read_via(page_table, addr)
                .map_err(|_| crate::error::KernelError::StringCopyAborted)?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
            addr += 1;
            if bytes.len() > MAX_NAME_LEN {
                return Err(crate::error::KernelError::StringCopyAborted);
            }
        }

        String::from_utf8(bytes).map_err(|_| crate::error::KernelError::StringCopyAborted)
    }
}

#[cfg(test)]
mod tests {
    use super::SyscallId;

    #[test]
    fn decodes_known_ids_and_rejects_others() {
        assert_eq!(SyscallId::from_register(1), Some(SyscallId::Le));
        assert_eq!(SyscallId::from_register(5), Some(SyscallId::EsperaProc));
        assert_eq!(SyscallId::from_register(99), None);
    }
}
