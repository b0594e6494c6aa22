//! Public, spec.md §6 surface: one free function per external symbol,
//! each locking [`crate::kernel_core`] for the duration of the call.
//!
//! `virt_is_mapped`/`virt_is_mapped_range` (no explicit context) operate
//! against the kernel context, matching how the rest of this API treats
//! the kernel context as the implicit default; the `_in_context`
//! variants take an explicit [`VirtContext`] for querying a user context
//! from kernel code (e.g. a page-fault handler).

use crate::dispatch::{Callback, Domain};
use crate::error::KernelResult;
use crate::event::EventOrigin;
use crate::irq::{self, IrqKind};
use crate::kernel_core::with_core;
use crate::mm::entry::{LeafEntry, MemoryType, PageFlags};
use crate::mm::pagetable::{ContextKind, VirtContext};

// --- C1: physical frames --------------------------------------------

pub fn phys_find_free(align: usize) -> KernelResult<usize> {
    with_core(|core| core.frames.find_free(align))
}

pub fn phys_find_free_range(bytes: usize, align: usize) -> KernelResult<usize> {
    with_core(|core| core.frames.find_free_range(bytes, align))
}

pub fn phys_free(phys: usize) {
    with_core(|core| core.frames.mark_free(phys))
}

pub fn phys_free_range(phys: usize, bytes: usize) {
    with_core(|core| core.frames.free_range(phys, bytes))
}

// --- C2/C3: virtual memory -------------------------------------------

pub fn virt_create_context(kind: ContextKind) -> KernelResult<VirtContext> {
    with_core(|core| core.virt.create_context(kind, &mut core.frames))
}

pub fn virt_destroy_context(ctx: VirtContext) {
    with_core(|core| core.virt.destroy_context(ctx, &mut core.frames))
}

pub fn virt_map_address(ctx: VirtContext, vaddr: usize, paddr: usize, mem_type: MemoryType, flags: PageFlags) -> KernelResult<()> {
    with_core(|core| core.virt.map_range(ctx, vaddr, paddr, 1, mem_type, flags, &mut core.frames))
}

pub fn virt_map_address_range(
    ctx: VirtContext,
    vaddr: usize,
    paddr: usize,
    len: usize,
    mem_type: MemoryType,
    flags: PageFlags,
) -> KernelResult<()> {
    with_core(|core| core.virt.map_range(ctx, vaddr, paddr, len, mem_type, flags, &mut core.frames))
}

pub fn virt_map_address_random(ctx: VirtContext, vaddr: usize, mem_type: MemoryType, flags: PageFlags) -> KernelResult<usize> {
    with_core(|core| core.virt.map_random(ctx, vaddr, mem_type, flags, &mut core.frames))
}

pub fn virt_map_address_range_random(
    ctx: VirtContext,
    vaddr: usize,
    len: usize,
    mem_type: MemoryType,
    flags: PageFlags,
) -> KernelResult<()> {
    with_core(|core| core.virt.map_range_random(ctx, vaddr, len, mem_type, flags, &mut core.frames))
}

pub fn virt_unmap_address(ctx: VirtContext, vaddr: usize, free_phys: bool) {
    with_core(|core| core.virt.unmap_range(ctx, vaddr, 1, free_phys, &mut core.frames))
}

pub fn virt_unmap_address_range(ctx: VirtContext, vaddr: usize, len: usize, free_phys: bool) {
    with_core(|core| core.virt.unmap_range(ctx, vaddr, len, free_phys, &mut core.frames))
}

pub fn virt_set_context(ctx: VirtContext) {
    with_core(|core| core.virt.set_context(ctx))
}

pub fn virt_flush_address(vaddr: usize) {
    with_core(|core| core.virt.flush_address(vaddr))
}

pub fn virt_flush_complete() {
    with_core(|core| core.virt.flush_complete())
}

pub fn virt_is_mapped_in_context(ctx: VirtContext, vaddr: usize) -> Option<LeafEntry> {
    with_core(|core| core.virt.is_mapped(ctx, vaddr, &mut core.frames))
}

pub fn virt_is_mapped_range_in_context(ctx: VirtContext, vaddr: usize, len: usize) -> bool {
    with_core(|core| core.virt.is_mapped_range(ctx, vaddr, len, &mut core.frames))
}

pub fn virt_is_mapped(vaddr: usize) -> Option<LeafEntry> {
    with_core(|core| {
        let ctx = core.virt.kernel_context();
        core.virt.is_mapped(ctx, vaddr, &mut core.frames)
    })
}

pub fn virt_is_mapped_range(vaddr: usize, len: usize) -> bool {
    with_core(|core| {
        let ctx = core.virt.kernel_context();
        core.virt.is_mapped_range(ctx, vaddr, len, &mut core.frames)
    })
}

pub fn virt_find_free_range(ctx: VirtContext, bytes: usize) -> KernelResult<usize> {
    with_core(|core| core.virt.find_free_range(ctx, bytes, &mut core.frames))
}

// --- C4: kernel heap ---------------------------------------------------

pub fn heap_alloc(bytes: usize) -> KernelResult<usize> {
    with_core(|core| core.heap.allocate(bytes))
}

pub fn heap_free(vaddr: usize) {
    with_core(|core| core.heap.free(vaddr))
}

// --- C5: dispatch fabric + event bus ------------------------------------

pub fn register_handler(domain: Domain, key: u32, callback: Callback, post: bool) -> KernelResult<()> {
    with_core(|core| match irq_kind_for(domain) {
        Some(kind) => irq::register_handler(&mut core.dispatch, kind, key, callback, post),
        None => {
            core.dispatch.register(domain, key, callback, post);
            Ok(())
        }
    })
}

pub fn unregister_handler(domain: Domain, key: u32, callback: Callback, post: bool) {
    with_core(|core| match irq_kind_for(domain) {
        Some(kind) => irq::unregister_handler(&mut core.dispatch, kind, key, callback, post),
        None => core.dispatch.unregister(domain, key, callback, post),
    })
}

fn irq_kind_for(domain: Domain) -> Option<IrqKind> {
    match domain {
        Domain::IrqNormal => Some(IrqKind::Normal),
        Domain::IrqFast => Some(IrqKind::Fast),
        Domain::IrqSoftware => Some(IrqKind::Software),
        Domain::Event => None,
    }
}

pub fn event_bind(event_type: u32, callback: Callback, post: bool) {
    with_core(|core| crate::event::EventBus::bind(&mut core.dispatch, event_type, callback, post))
}

pub fn event_enqueue(event_type: u32, origin: EventOrigin) {
    with_core(|core| core.events.enqueue(event_type, origin))
}

/// Drain every pending event (kernel queue first, then user), dispatching
/// each to its bound callbacks.
pub fn event_handle() {
    with_core(|core| core.events.handle(&core.dispatch))
}
