//! C2: page-table engine facade, spec.md §4.2.
//!
//! Dispatches the shared [`geometry`] walker over either the [`short`] or
//! [`lpae`] level tables depending on the MMU mode probed at construction
//! time, and owns the [`TempWindow`] bookkeeping for the transient mapping
//! window every table edit conceptually goes through on real hardware.

use crate::arch;
use crate::config::{PAGE_SIZE, TEMP_SIZE};
use crate::error::{KernelError, KernelResult};
use crate::mm::entry::{LeafEntry, MemoryType, PageFlags};
use crate::mm::frame::FrameAllocator;
use crate::mm::geometry::{self, LevelSpec};
use crate::mm::table_store::TableStore;
use crate::mm::{lpae, short};
use crate::panic::panic;

/// Probed MMU capability set (spec.md §4.2). Decoded here, not in
/// [`arch::ArchOps`], because what counts as "supported" and which level
/// geometry it implies is this facade's business, not the CPU driver's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmuMode {
    V6Short,
    V7Short,
    V7ShortPxn,
    V7Lpae,
}

fn decode_mode(field: u32) -> Option<MmuMode> {
    match field & 0xF {
        0x1 => Some(MmuMode::V6Short),
        0x3 => Some(MmuMode::V7Short),
        0x4 => Some(MmuMode::V7ShortPxn),
        0x5 => Some(MmuMode::V7Lpae),
        _ => None,
    }
}

fn levels_for(mode: MmuMode) -> &'static [LevelSpec] {
    match mode {
        MmuMode::V7Lpae => &lpae::LEVELS,
        _ => &short::LEVELS,
    }
}

fn top_level_frames_for(mode: MmuMode) -> usize {
    match mode {
        MmuMode::V7Lpae => lpae::top_level_frames(),
        _ => short::top_level_frames(),
    }
}

/// Which half of the address space a context belongs to (spec.md §3):
/// kernel contexts are installed in TTBR1 and shared by every process;
/// user contexts are installed in TTBR0 and swapped on context switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Kernel,
    User,
}

/// Opaque handle to a top-level page table. Cheap to copy; the real state
/// lives in the engine's [`TableStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtContext {
    pub kind: ContextKind,
    pub root_phys: usize,
}

/// Bookkeeping for the transient mapping window (spec.md §4.2): a fixed
/// run of virtual addresses reserved at init, through which the engine
/// edits page-table frames that aren't otherwise mapped. `TableStore`
/// makes the actual byte-level aliasing unnecessary on a hosted target,
/// but the window's capacity is still tracked and enforced so `temp_map`
/// exhaustion behaves the way it would on real hardware.
pub struct TempWindow {
    capacity_frames: usize,
    occupied_frames: usize,
}

impl TempWindow {
    pub fn new() -> Self {
        TempWindow { capacity_frames: TEMP_SIZE / PAGE_SIZE, occupied_frames: 0 }
    }

    /// Reserve `frame_count` window slots for a temporary mapping,
    /// invalidating the TLB for the newly (re)used range.
    pub fn temp_map(&mut self, frame_count: usize) -> KernelResult<()> {
        if self.occupied_frames + frame_count > self.capacity_frames {
            return Err(KernelError::NoSpace);
        }
        self.occupied_frames += frame_count;
        arch::ops().dsb();
        Ok(())
    }

    /// Release `frame_count` window slots previously taken by `temp_map`.
    pub fn temp_unmap(&mut self, frame_count: usize) {
        self.occupied_frames = self.occupied_frames.saturating_sub(frame_count);
        arch::ops().dsb();
        arch::ops().isb();
    }
}

/// The page-table engine: one instance shared by every [`VirtContext`],
/// backed by one [`TableStore`] holding every table frame in the system
/// regardless of which context it belongs to (frames are disambiguated
/// by physical address, same as on real hardware).
pub struct PageTableEngine {
    mode: MmuMode,
    store: TableStore,
    window: TempWindow,
    live_kernel: Option<usize>,
    live_user: Option<usize>,
}

impl PageTableEngine {
    /// Probe the MMU mode and bring up an empty engine. Unsupported modes
    /// are fatal (spec.md §7): there is no recoverable path for a CPU the
    /// kernel can't build page tables for.
    pub fn new() -> Self {
        let field = arch::ops().mmfr0_vmsa();
        let mode = decode_mode(field).unwrap_or_else(|| panic("unsupported MMU mode"));
        PageTableEngine {
            mode,
            store: TableStore::new(),
            window: TempWindow::new(),
            live_kernel: None,
            live_user: None,
        }
    }

    pub fn mode(&self) -> MmuMode {
        self.mode
    }

    fn levels(&self) -> &'static [LevelSpec] {
        levels_for(self.mode)
    }

    fn is_live(&self, ctx: VirtContext) -> bool {
        match ctx.kind {
            ContextKind::Kernel => self.live_kernel == Some(ctx.root_phys),
            ContextKind::User => self.live_user == Some(ctx.root_phys),
        }
    }

    /// Allocate a zeroed top-level table and wrap it as a fresh context.
    pub fn create_context(&mut self, kind: ContextKind, frames: &mut FrameAllocator) -> KernelResult<VirtContext> {
        let top_frames = top_level_frames_for(self.mode);
        self.window.temp_map(top_frames)?;
        let root_phys = geometry::alloc_table(top_frames, frames, &mut self.store);
        self.window.temp_unmap(top_frames);
        Ok(VirtContext { kind, root_phys: root_phys? })
    }

    /// Free every frame reachable from `ctx`: leaves (unless mapped
    /// `SHARED`, which this engine never owns), intermediate tables, and
    /// finally the top-level table itself.
    pub fn destroy_context(&mut self, ctx: VirtContext, frames: &mut FrameAllocator) {
        let levels = self.levels();
        geometry::walk_and_free_all(levels, ctx.root_phys, 0, frames, &mut self.store, |raw, frames| {
            if let Some(leaf) = LeafEntry::decode(raw) {
                if !leaf.flags.contains(PageFlags::SHARED) {
                    frames.free_range(leaf.phys, PAGE_SIZE);
                }
            }
        });
        let top_frames = top_level_frames_for(self.mode);
        geometry::free_table(ctx.root_phys, top_frames, frames, &mut self.store);
        match ctx.kind {
            ContextKind::Kernel if self.live_kernel == Some(ctx.root_phys) => self.live_kernel = None,
            ContextKind::User if self.live_user == Some(ctx.root_phys) => self.live_user = None,
            _ => {}
        }
    }

    /// Install `ctx` as the live kernel or user context: write the
    /// matching TTBR, then fence and invalidate so the new tables take
    /// effect before any further memory access.
    pub fn set_context(&mut self, ctx: VirtContext) {
        match ctx.kind {
            ContextKind::Kernel => {
                arch::ops().write_ttbr1(ctx.root_phys);
                self.live_kernel = Some(ctx.root_phys);
            }
            ContextKind::User => {
                arch::ops().write_ttbr0(ctx.root_phys);
                self.live_user = Some(ctx.root_phys);
            }
        }
        arch::ops().isb();
        arch::ops().dsb();
        arch::ops().icache_invalidate_all();
        arch::ops().tlb_invalidate_all();
    }

    /// Install a leaf mapping. Fails `ALREADY_MAPPED` if one exists
    /// (spec.md §4.2); intermediate tables are allocated on demand.
    pub fn map(
        &mut self,
        ctx: VirtContext,
        vaddr: usize,
        paddr: usize,
        mem_type: MemoryType,
        flags: PageFlags,
        frames: &mut FrameAllocator,
    ) -> KernelResult<()> {
        let levels = self.levels();
        let (leaf_table, leaf_idx) =
            geometry::walk_to_leaf(levels, ctx.root_phys, vaddr, true, frames, &mut self.store)?
                .expect("walk_to_leaf(create = true) always resolves a leaf slot");
        if self.store.read(leaf_table, leaf_idx) & 1 != 0 {
            return Err(KernelError::AlreadyMapped);
        }
        self.window.temp_map(1)?;
        let raw = LeafEntry { phys: paddr, mem_type, flags }.encode();
        self.store.write(leaf_table, leaf_idx, raw);
        self.window.temp_unmap(1);
        if self.is_live(ctx) {
            arch::ops().tlb_invalidate_addr(vaddr);
        }
        Ok(())
    }

    /// As [`Self::map`], but the physical frame is allocated from `frames`
    /// rather than supplied by the caller (spec.md §4.2's `map_random`).
    pub fn map_random(
        &mut self,
        ctx: VirtContext,
        vaddr: usize,
        mem_type: MemoryType,
        flags: PageFlags,
        frames: &mut FrameAllocator,
    ) -> KernelResult<usize> {
        let paddr = frames.find_free(0)?;
        match self.map(ctx, vaddr, paddr, mem_type, flags, frames) {
            Ok(()) => Ok(paddr),
            Err(e) => {
                frames.mark_free(paddr);
                Err(e)
            }
        }
    }

    /// Clear a leaf mapping if present; no-op otherwise. Optionally frees
    /// the backing frame. Does not collapse now-empty intermediate tables
    /// (spec.md §9): a later `map` over the same range reuses them.
    pub fn unmap(&mut self, ctx: VirtContext, vaddr: usize, free_phys: bool, frames: &mut FrameAllocator) {
        let levels = self.levels();
        let found = geometry::walk_to_leaf(levels, ctx.root_phys, vaddr, false, frames, &mut self.store)
            .unwrap_or(None);
        let Some((leaf_table, leaf_idx)) = found else { return };
        let raw = self.store.read(leaf_table, leaf_idx);
        let Some(leaf) = LeafEntry::decode(raw) else { return };
        self.store.write(leaf_table, leaf_idx, 0);
        if free_phys {
            frames.mark_free(leaf.phys);
        }
        if self.is_live(ctx) {
            arch::ops().tlb_invalidate_addr(vaddr);
        }
    }

    pub fn is_mapped(&mut self, ctx: VirtContext, vaddr: usize, frames: &mut FrameAllocator) -> Option<LeafEntry> {
        let levels = self.levels();
        let (leaf_table, leaf_idx) =
            geometry::walk_to_leaf(levels, ctx.root_phys, vaddr, false, frames, &mut self.store).ok()??;
        LeafEntry::decode(self.store.read(leaf_table, leaf_idx))
    }

    /// True only if every page in `[vaddr, vaddr + len)` is mapped.
    pub fn is_mapped_range(&mut self, ctx: VirtContext, vaddr: usize, len: usize, frames: &mut FrameAllocator) -> bool {
        let pages = len.div_ceil(PAGE_SIZE).max(1);
        (0..pages).all(|i| self.is_mapped(ctx, vaddr + i * PAGE_SIZE, frames).is_some())
    }

    pub fn flush_address(&self, vaddr: usize) {
        arch::ops().tlb_invalidate_addr(vaddr);
    }

    pub fn flush_complete(&self) {
        arch::ops().tlb_invalidate_all();
        arch::ops().icache_invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::frame::FrameAllocator;

    fn engine_with_frames() -> (PageTableEngine, FrameAllocator) {
        crate::arch::sim::set_mmfr0_vmsa(0x5); // LPAE
        let mut frames = FrameAllocator::new(16 * 1024 * 1024);
        frames.reserve_boot_range(0x0010_8000);
        (PageTableEngine::new(), frames)
    }

    #[test]
    fn map_unmap_round_trip_preserves_closure() {
        // Property 2: map then unmap leaves the address unmapped and the
        // backing frame free again.
        let (mut engine, mut frames) = engine_with_frames();
        let ctx = engine.create_context(ContextKind::User, &mut frames).unwrap();
        let vaddr = 0x0020_0000;
        let paddr = engine
            .map_random(ctx, vaddr, MemoryType::Normal, PageFlags::NONE, &mut frames)
            .unwrap();
        assert!(engine.is_mapped(ctx, vaddr, &mut frames).is_some());
        assert!(frames.is_used_test(paddr));

        engine.unmap(ctx, vaddr, true, &mut frames);
        assert!(engine.is_mapped(ctx, vaddr, &mut frames).is_none());
        assert!(!frames.is_used_test(paddr));
    }

    #[test]
    fn double_map_is_rejected() {
        let (mut engine, mut frames) = engine_with_frames();
        let ctx = engine.create_context(ContextKind::User, &mut frames).unwrap();
        let vaddr = 0x0040_0000;
        engine.map_random(ctx, vaddr, MemoryType::Normal, PageFlags::NONE, &mut frames).unwrap();
        let err = engine.map_random(ctx, vaddr, MemoryType::Normal, PageFlags::NONE, &mut frames);
        assert_eq!(err, Err(KernelError::AlreadyMapped));
    }

    #[test]
    fn unmap_of_absent_mapping_is_a_no_op() {
        let (mut engine, mut frames) = engine_with_frames();
        let ctx = engine.create_context(ContextKind::User, &mut frames).unwrap();
        engine.unmap(ctx, 0x0060_0000, true, &mut frames); // must not panic
        assert!(engine.is_mapped(ctx, 0x0060_0000, &mut frames).is_none());
    }

    #[test]
    fn contexts_are_isolated() {
        // Property 3: a mapping installed in one context is invisible in
        // another context covering the same virtual address.
        let (mut engine, mut frames) = engine_with_frames();
        let a = engine.create_context(ContextKind::User, &mut frames).unwrap();
        let b = engine.create_context(ContextKind::User, &mut frames).unwrap();
        let vaddr = 0x0080_0000;
        engine.map_random(a, vaddr, MemoryType::Normal, PageFlags::NONE, &mut frames).unwrap();
        assert!(engine.is_mapped(a, vaddr, &mut frames).is_some());
        assert!(engine.is_mapped(b, vaddr, &mut frames).is_none());
    }

    #[test]
    fn destroy_context_frees_every_leaf_and_table_frame() {
        let (mut engine, mut frames) = engine_with_frames();
        let ctx = engine.create_context(ContextKind::User, &mut frames).unwrap();
        let before = frames.total_frames();
        let _ = before;
        let mut mapped = alloc::vec::Vec::new();
        for i in 0..4 {
            let vaddr = 0x0100_0000 + i * PAGE_SIZE;
            let paddr = engine
                .map_random(ctx, vaddr, MemoryType::Normal, PageFlags::NONE, &mut frames)
                .unwrap();
            mapped.push(paddr);
        }
        engine.destroy_context(ctx, &mut frames);
        for paddr in mapped {
            assert!(!frames.is_used_test(paddr));
        }
    }

    #[test]
    fn short_mode_uses_two_level_geometry() {
        crate::arch::sim::set_mmfr0_vmsa(0x3); // V7Short
        let mut frames = FrameAllocator::new(16 * 1024 * 1024);
        frames.reserve_boot_range(0x0010_8000);
        let mut engine = PageTableEngine::new();
        assert_eq!(engine.mode(), MmuMode::V7Short);
        let ctx = engine.create_context(ContextKind::User, &mut frames).unwrap();
        let vaddr = 0x0020_0000;
        engine.map_random(ctx, vaddr, MemoryType::Normal, PageFlags::NONE, &mut frames).unwrap();
        assert!(engine.is_mapped(ctx, vaddr, &mut frames).is_some());
    }
}
