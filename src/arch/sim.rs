//! Hosted simulator backend for the architecture layer.
//!
//! Stands in for real ARM `asm!` when running on the host (`cargo test`)
//! or under the `sim` feature. State is tracked with atomics so the
//! backend is `Sync` and usable from a `static`, matching the real
//! backend's zero-sized-singleton shape.

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use super::ArchOps;

pub struct SimOps;

static TTBR0: AtomicUsize = AtomicUsize::new(0);
static TTBR1: AtomicUsize = AtomicUsize::new(0);
static IRQ_DISABLE_DEPTH: AtomicU32 = AtomicU32::new(0);
static MMFR0_VMSA: AtomicU32 = AtomicU32::new(0x5); // default: LPAE

/// Test helper: select which raw `MMFR0[3:0]` value `mmfr0_vmsa` reports.
pub fn set_mmfr0_vmsa(field: u32) {
    MMFR0_VMSA.store(field, Ordering::SeqCst);
}

/// Test helper: whether IRQs are currently (simulated-)masked.
pub fn irqs_disabled() -> bool {
    IRQ_DISABLE_DEPTH.load(Ordering::SeqCst) > 0
}

impl ArchOps for SimOps {
    fn mmfr0_vmsa(&self) -> u32 {
        MMFR0_VMSA.load(Ordering::SeqCst)
    }

    fn disable_irqs(&self) {
        IRQ_DISABLE_DEPTH.fetch_add(1, Ordering::SeqCst);
    }

    fn enable_irqs(&self) {
        IRQ_DISABLE_DEPTH.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| {
            Some(d.saturating_sub(1))
        }).ok();
    }

    fn wait_for_event(&self) {
        // hosted tests never actually block.
    }

    fn write_ttbr0(&self, table_phys: usize) {
        TTBR0.store(table_phys, Ordering::SeqCst);
    }

    fn write_ttbr1(&self, table_phys: usize) {
        TTBR1.store(table_phys, Ordering::SeqCst);
    }

    fn read_ttbr0(&self) -> usize {
        TTBR0.load(Ordering::SeqCst)
    }

    fn read_ttbr1(&self) -> usize {
        TTBR1.load(Ordering::SeqCst)
    }

    fn tlb_invalidate_all(&self) {}
    fn tlb_invalidate_addr(&self, _vaddr: usize) {}
    fn icache_invalidate_all(&self) {}

    fn dsb(&self) {}
    fn isb(&self) {}
}
