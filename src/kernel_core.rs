//! Single global kernel state, grounded on the teacher's `spinning_top`-
//! guarded singleton pattern (`examples/netoneko-akuma/src/pmm.rs` and
//! `allocator.rs` both keep their state behind one global `Spinlock`
//! rather than threading it through every call). Every C1–C5 component
//! lives here as one field apiece; [`crate::api`] is the only thing
//! that locks this directly.

use spinning_top::Spinlock;

use crate::dispatch::Dispatcher;
use crate::error::KernelResult;
use crate::event::EventBus;
use crate::heap::Heap;
use crate::mm::context::VirtualMemory;
use crate::mm::frame::FrameAllocator;

pub struct KernelCore {
    pub frames: FrameAllocator,
    pub virt: VirtualMemory,
    pub heap: Heap,
    pub dispatch: Dispatcher,
    pub events: EventBus,
}

static KERNEL: Spinlock<Option<KernelCore>> = Spinlock::new(None);

/// Bring up every core component in dependency order: C1 before C2/C3
/// (table allocation needs frames), C3 before C4 (the heap needs mapped
/// pages), C5 last (nothing before it depends on the dispatch fabric).
pub fn init(total_ram_bytes: usize, placement_address: usize, kernel_end: usize, initrd: Option<(usize, usize)>) -> KernelResult<()> {
    let mut frames = FrameAllocator::new(total_ram_bytes);
    frames.reserve_boot_range(placement_address);

    let mut virt = VirtualMemory::new();
    virt.init(&mut frames, kernel_end, initrd)?;

    let mut heap = Heap::new();
    heap.init(&mut virt, &mut frames)?;

    *KERNEL.lock() = Some(KernelCore {
        frames,
        virt,
        heap,
        dispatch: Dispatcher::new(),
        events: EventBus::new(),
    });
    Ok(())
}

pub fn is_initialised() -> bool {
    KERNEL.lock().is_some()
}

/// Run `f` with exclusive access to the kernel core. Panics if
/// [`init`] hasn't run yet — every caller in [`crate::api`] only runs
/// after boot has called `init`.
pub fn with_core<R>(f: impl FnOnce(&mut KernelCore) -> R) -> R {
    let mut guard = KERNEL.lock();
    let core = guard.as_mut().unwrap_or_else(|| crate::panic::panic("kernel core used before init"));
    f(core)
}

#[cfg(test)]
pub fn reset_for_test() {
    *KERNEL.lock() = None;
}
