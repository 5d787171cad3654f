//! Page replacement (§4.8): FIFO and LRU/Aging. Both consult only the
//! dirty/reference-bit predicates on `PageTable`, never its internals.

use super::{FrameId, FrameTable, PageTable};
use std::collections::VecDeque;

/// Capability consulted by the page fault handler whenever a frame must
/// be handed out. `on_frame_allocated` is called both when a never-used
/// frame is taken and when a victim is immediately reused — in both
/// cases the frame is "about to be used", so FIFO enqueues it exactly
/// once per allocation (§4.8).
pub trait ReplacementPolicy: std::fmt::Debug {
    fn on_frame_allocated(&mut self, frame: FrameId);
    fn pick_victim(&mut self, frames: &FrameTable) -> FrameId;

    /// `kill_process` just returned `frame` to the free list (§4.6
    /// `MATA_PROC`: "remove from replacement structure"). Any internal
    /// bookkeeping that still names `frame` must forget it here, or a
    /// later reallocation re-adds it and the structure accumulates stale
    /// duplicates. No-op for policies with no such bookkeeping (LRU's
    /// `pick_victim` scans `FrameTable` directly and already filters on
    /// `owner.is_some()`).
    fn on_frame_released(&mut self, _frame: FrameId) {}

    /// LRU-only hook: age the frames owned by the currently-running
    /// process on every CLOCK IRQ (§4.8). No-op for FIFO.
    fn on_clock_tick(
        &mut self,
        _frames: &mut FrameTable,
        _running_idx: usize,
        _page_table: &mut dyn PageTable,
    ) {
    }
}

#[derive(Debug, Default)]
pub struct Fifo {
    ring: VecDeque<FrameId>,
}

impl Fifo {
    pub fn new() -> Self {
        Fifo::default()
    }
}

impl ReplacementPolicy for Fifo {
    fn on_frame_allocated(&mut self, frame: FrameId) {
        self.ring.push_back(frame);
    }

    fn pick_victim(&mut self, _frames: &FrameTable) -> FrameId {
        self.ring
            .pop_front()
            .expect("pick_victim called with no candidate frames")
    }

    fn on_frame_released(&mut self, frame: FrameId) {
        self.ring.retain(|&f| f != frame);
    }
}

/// Software LRU approximation via an aging counter colocated with each
/// frame's inverted-table entry (`FrameEntry::age`).
#[derive(Debug, Default)]
pub struct LruAging;

impl LruAging {
    pub fn new() -> Self {
        LruAging
    }
}

impl ReplacementPolicy for LruAging {
    fn on_frame_allocated(&mut self, _frame: FrameId) {
        // Age starts at 0 — FrameTable::set_owner already resets it.
    }

    fn pick_victim(&mut self, frames: &FrameTable) -> FrameId {
        frames
            .entries()
            .iter()
            .enumerate()
            .skip(frames.reserved())
            .filter(|(_, e)| e.owner.is_some())
            .min_by_key(|(idx, e)| (e.age, *idx))
            .map(|(idx, _)| FrameId(idx))
            .expect("pick_victim called with no candidate frames")
    }

    fn on_clock_tick(&mut self, frames: &mut FrameTable, running_idx: usize, page_table: &mut dyn PageTable) {
        let reserved = frames.reserved();
        for entry in frames.entries_mut().iter_mut().skip(reserved) {
            if entry.owner != Some(running_idx) {
                continue;
            }
            entry.age >>= 1;
            if page_table.reference_bit(entry.vpage) {
                entry.age |= 1 << 31;
                page_table.clear_reference_bit(entry.vpage);
            }
        }
    }
}
