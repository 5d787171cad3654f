//! Page fault handler (§4.7): bounds check, frame acquisition (fresh or
//! replaced), load, install, and the simulated disk-time debt.

use super::FrameId;
use crate::kernel::Kernel;
use crate::process::{metrics::StateBucket, BlockReason, ProcessState};

impl Kernel {
    /// Invoked from the `CPU_ERROR` handler when `ERR == PAGE_ABSENT`.
    pub(crate) fn handle_page_fault(&mut self, idx: usize) {
        let now = self.io.now();
        let vaddr = self.table.get(idx).context.complement;
        let mem_size = self.table.get(idx).mem_size;

        if vaddr < 0 || vaddr as u64 >= mem_size {
            log::warn!("segmentation fault: pid slot {idx} accessed {vaddr:#x}");
            self.kill_process(idx, now);
            return;
        }

        self.table.get_mut(idx).page_faults += 1;

        let page = vaddr as u64 / self.cfg.page_size;
        let (frame, swap_out_cost) = self.acquire_frame();

        let exe_name = self.table.get(idx).exe_name.clone();
        let load_addr = match self.loader.load_address(&exe_name) {
            Ok(v) => v,
            Err(e) => {
                self.fail(e);
                return;
            }
        };
        if let Err(e) = self.fill_page(&exe_name, load_addr, mem_size, page, frame) {
            self.fail(e);
            return;
        }

        self.frames.set_owner(frame, idx, page);
        if let Some(pt) = self.table.get_mut(idx).page_table.as_deref_mut() {
            pt.map(page, frame);
        }

        let eta = now.max(self.disk_free_time) + swap_out_cost + self.cfg.disk_transfer;
        self.disk_free_time = eta;

        let pcb = self.table.get_mut(idx);
        pcb.disk_io_eta = eta;
        pcb.metrics.enter_state(StateBucket::Running, now);
        pcb.state = ProcessState::Blocked(BlockReason::Paging);
        // Saved PC is left untouched: the faulting instruction retries on resume.
    }

    /// Step 3 of §4.7: take a never-used frame, or run replacement.
    /// Returns the frame and the `swap_out_cost` charged against
    /// `disk_free_time` (0 for a fresh frame or a clean victim).
    fn acquire_frame(&mut self) -> (FrameId, u64) {
        if let Some(frame) = self.frames.take_fresh_frame() {
            self.replacement.on_frame_allocated(frame);
            return (frame, 0);
        }

        let victim = self.replacement.pick_victim(&self.frames);
        let entry = *self.frames.entry(victim);
        let victim_owner = entry
            .owner
            .expect("replacement policy picked an unowned frame");

        let swap_out_cost = {
            let victim_pt = self
                .table
                .get_mut(victim_owner)
                .page_table
                .as_deref_mut()
                .expect("victim frame owner has no page table");
            let dirty = victim_pt.dirty_bit(entry.vpage);
            victim_pt.invalidate(entry.vpage);
            if dirty {
                self.cfg.disk_transfer
            } else {
                0
            }
        };

        self.replacement.on_frame_allocated(victim);
        (victim, swap_out_cost)
    }

    /// Copies `page` of `name` into `frame`, zero-filling bytes past
    /// `mem_size` (§4.7 step 4). The fill destination is the loader
    /// boundary's responsibility (§6) since physical frame content is
    /// out of scope for the kernel to touch directly.
    pub(crate) fn fill_page(
        &self,
        name: &str,
        load_addr: u64,
        mem_size: u64,
        page: u64,
        frame: FrameId,
    ) -> Result<(), crate::error::KernelError> {
        let page_base = page * self.cfg.page_size;
        let file_offset = load_addr + page_base;
        let valid_len = mem_size.saturating_sub(page_base).min(self.cfg.page_size);
        self.loader
            .load_page(name, file_offset, frame, self.cfg.page_size, valid_len)
    }
}
