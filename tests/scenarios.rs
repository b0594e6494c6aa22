//! End-to-end scenarios from spec.md §8, driven entirely through the
//! public [`ignis_kernel::api`] surface against one boot via
//! [`ignis_kernel::kernel_core::init`].
//!
//! Run with `cargo test --features sim`: this crate depends on
//! `ignis_kernel` as an ordinary external dependency, so `cfg(test)`
//! inside the library does not apply here — the hosted simulator
//! backend has to be selected explicitly via the `sim` feature instead
//! (see the `sim` feature's doc comment in `Cargo.toml`).
//!
//! All six scenarios run from a single `#[test]` function: `KernelCore`
//! lives behind one process-wide lock, and `cargo test` runs tests in
//! parallel by default, so interleaving two independent boots would
//! corrupt each other's frame bitmap and page tables.

use ignis_kernel::api;
use ignis_kernel::config::{PAGE_SIZE, USER_AREA_START};
use ignis_kernel::kernel_core;
use ignis_kernel::mm::entry::{MemoryType, PageFlags};
use ignis_kernel::mm::pagetable::ContextKind;
use std::vec::Vec;

#[test]
fn spec_scenarios_s1_through_s6() {
    const MIB: usize = 1024 * 1024;
    const PLACEMENT_ADDRESS: usize = 0x0010_8000;

    kernel_core::init(16 * MIB, PLACEMENT_ADDRESS, PLACEMENT_ADDRESS, None).expect("kernel_core::init");

    // S1: first 264 frames reserved, frame 264 (0x108000) is the first free one.
    assert_eq!(PLACEMENT_ADDRESS / PAGE_SIZE, 264);
    let first_free = api::phys_find_free(0).expect("S1: a free frame must exist");
    assert_eq!(first_free, PLACEMENT_ADDRESS);
    api::phys_free(first_free); // undo this probe so later scenarios see the same frames S1 did

    // S2: map/unmap an 8-page range in the kernel context, frames come free again.
    let kernel_ctx = api::virt_create_context(ContextKind::Kernel).expect("S2: create_context");
    let vbase = 0xC010_0000;
    let pbase = 0x0010_0000;
    let len = 8 * PAGE_SIZE;
    api::virt_map_address_range(kernel_ctx, vbase, pbase, len, MemoryType::Normal, PageFlags::EXECUTABLE)
        .expect("S2: map_range");
    assert!(api::virt_is_mapped_range_in_context(kernel_ctx, vbase, len));
    api::virt_unmap_address_range(kernel_ctx, vbase, len, true);
    assert!(!api::virt_is_mapped_range_in_context(kernel_ctx, vbase, len));
    // Frames 0x100..0x107 are free again: reclaiming the whole run in one
    // shot must hand back exactly the base `unmap_range` just released.
    assert_eq!(api::phys_find_free_range(len, 0), Ok(pbase));
    api::phys_free_range(pbase, len);

    // S3: heap_alloc(64) carves 64 + header bytes off the largest free block.
    let addr = api::heap_alloc(64).expect("S3: heap_alloc");
    assert!(addr > ignis_kernel::config::HEAP_START);
    api::heap_free(addr);
    // A second allocation of the same size must land at the same address:
    // freeing coalesced the block back to a single largest-free-block.
    let addr2 = api::heap_alloc(64).expect("S3: heap_alloc after free");
    assert_eq!(addr, addr2);
    api::heap_free(addr2);

    // S4: H1 (pre), H2 (pre), H3 (post) at IRQ key 7, observed in that order.
    use core::sync::atomic::{AtomicU32, Ordering};
    static SEQ: AtomicU32 = AtomicU32::new(0);
    static ORDER: [AtomicU32; 3] = [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)];
    fn h1(_k: u32, _d: usize) {
        ORDER[0].store(SEQ.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
    }
    fn h2(_k: u32, _d: usize) {
        ORDER[1].store(SEQ.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
    }
    fn h3(_k: u32, _d: usize) {
        ORDER[2].store(SEQ.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
    }
    api::register_handler(ignis_kernel::dispatch::Domain::IrqNormal, 7, h1, false).unwrap();
    api::register_handler(ignis_kernel::dispatch::Domain::IrqNormal, 7, h2, false).unwrap();
    api::register_handler(ignis_kernel::dispatch::Domain::IrqNormal, 7, h3, true).unwrap();
    ignis_kernel::kernel_core::with_core(|core| {
        ignis_kernel::irq::handle(ignis_kernel::irq::IrqKind::Normal, 7, &core.dispatch)
    });
    let seq: Vec<u32> = ORDER.iter().map(|c| c.load(Ordering::SeqCst)).collect();
    assert!(seq[0] < seq[1] && seq[1] < seq[2], "S4: expected H1, H2, H3 in order, got {seq:?}");

    // S5: three TIMER events enqueued, one handle() drains all three and empties the queue.
    const TIMER: u32 = 1;
    static TIMER_HITS: AtomicU32 = AtomicU32::new(0);
    fn on_timer(_k: u32, _d: usize) {
        TIMER_HITS.fetch_add(1, Ordering::SeqCst);
    }
    api::event_bind(TIMER, on_timer, false);
    api::event_enqueue(TIMER, ignis_kernel::event::EventOrigin::Kernel);
    api::event_enqueue(TIMER, ignis_kernel::event::EventOrigin::Kernel);
    api::event_enqueue(TIMER, ignis_kernel::event::EventOrigin::Kernel);
    api::event_handle();
    assert_eq!(TIMER_HITS.load(Ordering::SeqCst), 3);
    // Queue left empty: a second drain dispatches nothing further.
    api::event_handle();
    assert_eq!(TIMER_HITS.load(Ordering::SeqCst), 3);

    // S6: find_free_range on an empty user context starts at USER_AREA_START,
    // then skips past whatever it just found is mapped.
    let user_ctx = api::virt_create_context(ContextKind::User).expect("S6: create_context");
    let found = api::virt_find_free_range(user_ctx, 4 * PAGE_SIZE).expect("S6: find_free_range");
    assert_eq!(found, USER_AREA_START);
    api::virt_map_address_range(
        user_ctx,
        USER_AREA_START,
        PLACEMENT_ADDRESS + 0x10_0000,
        PAGE_SIZE,
        MemoryType::Normal,
        PageFlags::NONE,
    )
    .expect("S6: map the first page");
    let found2 = api::virt_find_free_range(user_ctx, 4 * PAGE_SIZE).expect("S6: find_free_range after mapping");
    assert_eq!(found2, USER_AREA_START + PAGE_SIZE);
}
