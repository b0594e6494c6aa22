//! Global Rust allocator backing `extern crate alloc` (the `Vec`/`Box`/
//! `hashbrown::HashMap` used throughout C1–C6's own bookkeeping).
//!
//! This is distinct from [`crate::heap`] (C4): that module is the
//! spec'd, client-facing kernel heap reached through `heap_alloc`/
//! `heap_free`, backed by pages the virtual memory facade (C3) maps.
//! This allocator exists one layer further down, so the kernel's own
//! data structures (the frame bitmap, AVL trees, the software page
//! tables) have somewhere to allocate *before* C3 is even initialised.
//! It owns a small static arena rather than mapped pages for exactly
//! that reason.
//!
//! Grounded on `examples/netoneko-akuma/src/allocator.rs`'s
//! `talc`-backed global allocator, trimmed to a single arena — this
//! crate has no second, page-granular allocation mode to fall back to.

use core::alloc::{GlobalAlloc, Layout};
use core::sync::atomic::{AtomicUsize, Ordering};

use spinning_top::Spinlock;
use talc::{ErrOnOom, Span, Talc};

use crate::irq::with_irqs_disabled;

/// Backing store for the early/internal allocator. Sized generously
/// for the bitmap, AVL nodes, and software page tables a boot-time
/// `FrameAllocator`/`VirtualMemory`/`Dispatcher` need; real client
/// allocations go through [`crate::heap`] once C3 is up.
const ARENA_SIZE: usize = 4 * 1024 * 1024;

#[cfg(not(test))]
static mut ARENA: [u8; ARENA_SIZE] = [0; ARENA_SIZE];

#[cfg(not(test))]
static TALC: Spinlock<Talc<ErrOnOom>> = Spinlock::new(Talc::new(ErrOnOom));
#[cfg(not(test))]
static CLAIMED: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);

static ALLOCATED_BYTES: AtomicUsize = AtomicUsize::new(0);
static ALLOCATION_COUNT: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy)]
pub struct MemoryStats {
    pub allocated: usize,
    pub allocation_count: usize,
}

pub fn stats() -> MemoryStats {
    MemoryStats {
        allocated: ALLOCATED_BYTES.load(Ordering::Relaxed),
        allocation_count: ALLOCATION_COUNT.load(Ordering::Relaxed),
    }
}

/// Claim the static arena. Idempotent; safe to call once from boot
/// before anything else touches the allocator.
#[cfg(not(test))]
pub fn init() {
    if CLAIMED.swap(true, Ordering::SeqCst) {
        return;
    }
    unsafe {
        let span = Span::from_base_size(core::ptr::addr_of_mut!(ARENA) as *mut u8, ARENA_SIZE);
        TALC.lock().claim(span).unwrap_or_else(|_| crate::panic::panic("allocator arena claim failed"));
    }
}

#[global_allocator]
#[cfg(not(test))]
static ALLOCATOR: TalcAllocator = TalcAllocator;

#[cfg(not(test))]
struct TalcAllocator;

#[cfg(not(test))]
unsafe impl GlobalAlloc for TalcAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        with_irqs_disabled(|| unsafe {
            match TALC.lock().malloc(layout) {
                Ok(ptr) => {
                    ALLOCATED_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
                    ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
                    ptr.as_ptr()
                }
                Err(_) => core::ptr::null_mut(),
            }
        })
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        with_irqs_disabled(|| unsafe {
            TALC.lock().free(core::ptr::NonNull::new_unchecked(ptr), layout);
            ALLOCATED_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
        })
    }
}

