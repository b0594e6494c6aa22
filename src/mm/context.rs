//! C3: virtual memory facade, spec.md §4.3.
//!
//! Wraps [`PageTableEngine`] with range operations (`map_range`,
//! `unmap_range`, `find_free_range`) and the one-time bring-up sequence
//! that installs the kernel's own identity mapping and activates the
//! initial kernel/user contexts.

use crate::config::{KERNEL_AREA_END, KERNEL_AREA_START, PAGE_SIZE, USER_AREA_END, USER_AREA_START};
use crate::error::{KernelError, KernelResult};
use crate::mm::entry::{LeafEntry, MemoryType, PageFlags};
use crate::mm::frame::FrameAllocator;
use crate::mm::pagetable::{ContextKind, PageTableEngine, VirtContext};

/// Top-level virtual memory state: the page-table engine plus the two
/// contexts every kernel build needs at boot (one kernel, one user).
pub struct VirtualMemory {
    engine: PageTableEngine,
    kernel_ctx: Option<VirtContext>,
    user_ctx: Option<VirtContext>,
    initialised: bool,
}

impl VirtualMemory {
    pub fn new() -> Self {
        VirtualMemory {
            engine: PageTableEngine::new(),
            kernel_ctx: None,
            user_ctx: None,
            initialised: false,
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn kernel_context(&self) -> VirtContext {
        self.kernel_ctx.expect("virt::init must run before the kernel context is used")
    }

    pub fn user_context(&self) -> VirtContext {
        self.user_ctx.expect("virt::init must run before the user context is used")
    }

    /// One-time bring-up (spec.md §4.3): identity-map `[0, kernel_end)`
    /// into a fresh kernel context, optionally map an initrd region,
    /// run the vendor platform hooks, and activate both the kernel and
    /// the initial (dummy) user context.
    pub fn init(
        &mut self,
        frames: &mut FrameAllocator,
        kernel_end: usize,
        initrd: Option<(usize, usize)>,
    ) -> KernelResult<()> {
        let kernel_ctx = self.engine.create_context(ContextKind::Kernel, frames)?;
        let user_ctx = self.engine.create_context(ContextKind::User, frames)?;

        self.map_range(kernel_ctx, 0, 0, kernel_end, MemoryType::Normal, PageFlags::NONE, frames)?;
        if let Some((start, len)) = initrd {
            self.map_range(kernel_ctx, start, start, len, MemoryType::Normal, PageFlags::READ_ONLY, frames)?;
        }

        crate::vendor::rpi::phys_vendor_init(frames);
        crate::vendor::rpi::platform_init(&mut self.engine, kernel_ctx, frames)?;
        self.engine.set_context(kernel_ctx);
        self.engine.set_context(user_ctx);
        crate::vendor::rpi::platform_post_init(&mut self.engine, kernel_ctx, frames)?;

        self.kernel_ctx = Some(kernel_ctx);
        self.user_ctx = Some(user_ctx);
        self.initialised = true;
        Ok(())
    }

    pub fn create_context(&mut self, kind: ContextKind, frames: &mut FrameAllocator) -> KernelResult<VirtContext> {
        self.engine.create_context(kind, frames)
    }

    pub fn destroy_context(&mut self, ctx: VirtContext, frames: &mut FrameAllocator) {
        self.engine.destroy_context(ctx, frames)
    }

    pub fn set_context(&mut self, ctx: VirtContext) {
        self.engine.set_context(ctx)
    }

    pub fn flush_address(&self, vaddr: usize) {
        self.engine.flush_address(vaddr)
    }

    pub fn flush_complete(&self) {
        self.engine.flush_complete()
    }

    /// Mark `[paddr, paddr + len)` used in C1, then map every page of
    /// `[vaddr, vaddr + len)` to the matching offset of `[paddr, paddr + len)`.
    /// On a mid-range failure, unmaps whatever this call itself installed
    /// and releases the reservation it itself made, so a failed `map_range`
    /// leaves neither a partial mapping nor a leaked frame reservation.
    pub fn map_range(
        &mut self,
        ctx: VirtContext,
        vaddr: usize,
        paddr: usize,
        len: usize,
        mem_type: MemoryType,
        flags: PageFlags,
        frames: &mut FrameAllocator,
    ) -> KernelResult<()> {
        frames.use_range(paddr, len);
        let pages = len.div_ceil(PAGE_SIZE).max(1);
        for i in 0..pages {
            let v = vaddr + i * PAGE_SIZE;
            let p = paddr + i * PAGE_SIZE;
            if let Err(e) = self.engine.map(ctx, v, p, mem_type, flags, frames) {
                for j in 0..i {
                    self.engine.unmap(ctx, vaddr + j * PAGE_SIZE, false, frames);
                }
                frames.free_range(paddr, len);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Map one page at `vaddr`, letting the engine pick the backing
    /// frame; returns the physical address it chose.
    pub fn map_random(
        &mut self,
        ctx: VirtContext,
        vaddr: usize,
        mem_type: MemoryType,
        flags: PageFlags,
        frames: &mut FrameAllocator,
    ) -> KernelResult<usize> {
        self.engine.map_random(ctx, vaddr, mem_type, flags, frames)
    }

    /// As [`Self::map_range`], but each page's backing frame is allocated
    /// rather than supplied (spec.md §4.2's `map_random`, extended to a
    /// range). Rolls back both mappings and frames on failure.
    pub fn map_range_random(
        &mut self,
        ctx: VirtContext,
        vaddr: usize,
        len: usize,
        mem_type: MemoryType,
        flags: PageFlags,
        frames: &mut FrameAllocator,
    ) -> KernelResult<()> {
        let pages = len.div_ceil(PAGE_SIZE).max(1);
        for i in 0..pages {
            let v = vaddr + i * PAGE_SIZE;
            if let Err(e) = self.engine.map_random(ctx, v, mem_type, flags, frames) {
                for j in 0..i {
                    self.engine.unmap(ctx, vaddr + j * PAGE_SIZE, true, frames);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Clear every page of `[vaddr, vaddr + len)`. Each iteration targets
    /// `vaddr + i * PAGE_SIZE` — the range actually being unmapped, not a
    /// fixed address (spec.md §9.4).
    pub fn unmap_range(&mut self, ctx: VirtContext, vaddr: usize, len: usize, free_phys: bool, frames: &mut FrameAllocator) {
        let pages = len.div_ceil(PAGE_SIZE).max(1);
        for i in 0..pages {
            self.engine.unmap(ctx, vaddr + i * PAGE_SIZE, free_phys, frames);
        }
    }

    pub fn is_mapped(&mut self, ctx: VirtContext, vaddr: usize, frames: &mut FrameAllocator) -> Option<LeafEntry> {
        self.engine.is_mapped(ctx, vaddr, frames)
    }

    pub fn is_mapped_range(&mut self, ctx: VirtContext, vaddr: usize, len: usize, frames: &mut FrameAllocator) -> bool {
        self.engine.is_mapped_range(ctx, vaddr, len, frames)
    }

    /// Scan the context's address area for a hole of `len` bytes,
    /// returning its base without mapping anything.
    pub fn find_free_range(&mut self, ctx: VirtContext, len: usize, frames: &mut FrameAllocator) -> KernelResult<usize> {
        let (start, end) = match ctx.kind {
            ContextKind::Kernel => (KERNEL_AREA_START, KERNEL_AREA_END),
            ContextKind::User => (USER_AREA_START, USER_AREA_END),
        };
        let needed = len.div_ceil(PAGE_SIZE).max(1);
        let mut candidate = start;
        'outer: while candidate.saturating_add(needed * PAGE_SIZE) <= end {
            for i in 0..needed {
                if self.is_mapped(ctx, candidate + i * PAGE_SIZE, frames).is_some() {
                    candidate += (i + 1) * PAGE_SIZE;
                    continue 'outer;
                }
            }
            return Ok(candidate);
        }
        Err(KernelError::NoSpace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::frame::FrameAllocator;

    fn setup() -> (VirtualMemory, FrameAllocator) {
        crate::arch::sim::set_mmfr0_vmsa(0x5);
        let mut frames = FrameAllocator::new(16 * 1024 * 1024);
        frames.reserve_boot_range(0x0010_8000);
        (VirtualMemory::new(), frames)
    }

    #[test]
    fn unmap_range_clears_every_page_it_was_given() {
        // Regression test for spec.md §9.4: unmap_range must iterate the
        // addresses it was asked to unmap, not a fixed one.
        let (mut vm, mut frames) = setup();
        let ctx = vm.create_context(ContextKind::User, &mut frames).unwrap();
        let base = 0x0020_0000;
        let len = 4 * PAGE_SIZE;
        vm.map_range_random(ctx, base, len, MemoryType::Normal, PageFlags::NONE, &mut frames).unwrap();
        assert!(vm.is_mapped_range(ctx, base, len, &mut frames));

        vm.unmap_range(ctx, base, len, true, &mut frames);
        for i in 0..4 {
            assert!(vm.is_mapped(ctx, base + i * PAGE_SIZE, &mut frames).is_none());
        }
    }

    #[test]
    fn find_free_range_skips_existing_mappings() {
        let (mut vm, mut frames) = setup();
        let ctx = vm.create_context(ContextKind::User, &mut frames).unwrap();
        let occupied = USER_AREA_START;
        vm.map_range_random(ctx, occupied, 2 * PAGE_SIZE, MemoryType::Normal, PageFlags::NONE, &mut frames)
            .unwrap();
        let found = vm.find_free_range(ctx, PAGE_SIZE, &mut frames).unwrap();
        assert!(found >= occupied + 2 * PAGE_SIZE || found < occupied);
        assert!(!vm.is_mapped(ctx, found, &mut frames).is_some());
    }

    #[test]
    fn map_range_failure_rolls_back_partial_mapping() {
        let (mut vm, mut frames) = setup();
        let ctx = vm.create_context(ContextKind::User, &mut frames).unwrap();
        let base = 0x0050_0000;
        // Pre-map the third page so the range map fails partway through.
        vm.map_range_random(ctx, base + 2 * PAGE_SIZE, PAGE_SIZE, MemoryType::Normal, PageFlags::NONE, &mut frames)
            .unwrap();
        let err = vm.map_range_random(ctx, base, 4 * PAGE_SIZE, MemoryType::Normal, PageFlags::NONE, &mut frames);
        assert!(err.is_err());
        assert!(vm.is_mapped(ctx, base, &mut frames).is_none());
        assert!(vm.is_mapped(ctx, base + PAGE_SIZE, &mut frames).is_none());
    }
}
