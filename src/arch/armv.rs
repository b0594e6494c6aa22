//! Real ARMv6/v7 architecture backend. Only compiled for
//! `target_arch = "arm"` builds; every other configuration uses
//! [`super::sim`].

use core::arch::asm;
use core::sync::atomic::{AtomicU32, Ordering};

use super::ArchOps;

pub struct ArmOps;

/// `cpsid`/`cpsie` mask/unmask the I bit unconditionally; this counter
/// makes nested `disable_irqs`/`enable_irqs` pairs (e.g. two callers
/// each wrapping their own critical section) only unmask once the
/// outermost pair has unwound, matching [`super::sim`]'s depth tracking.
static DEPTH: AtomicU32 = AtomicU32::new(0);

impl ArchOps for ArmOps {
    fn mmfr0_vmsa(&self) -> u32 {
        let mmfr0: u32;
        unsafe {
            asm!("mrc p15, 0, {0}, c0, c1, 4", out(reg) mmfr0, options(nomem, nostack, preserves_flags));
        }
        mmfr0 & 0xF
    }

    fn disable_irqs(&self) {
        if DEPTH.fetch_add(1, Ordering::SeqCst) == 0 {
            unsafe {
                asm!("cpsid i", options(nomem, nostack, preserves_flags));
            }
        }
    }

    fn enable_irqs(&self) {
        if DEPTH.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_sub(1))) == Ok(1) {
            unsafe {
                asm!("cpsie i", options(nomem, nostack, preserves_flags));
            }
        }
    }

    fn wait_for_event(&self) {
        unsafe {
            asm!("wfe", options(nomem, nostack, preserves_flags));
        }
    }

    fn write_ttbr0(&self, table_phys: usize) {
        unsafe {
            asm!("mcr p15, 0, {0}, c2, c0, 0", in(reg) table_phys as u32, options(nostack, preserves_flags));
        }
    }

    fn write_ttbr1(&self, table_phys: usize) {
        unsafe {
            asm!("mcr p15, 0, {0}, c2, c0, 1", in(reg) table_phys as u32, options(nostack, preserves_flags));
        }
    }

    fn read_ttbr0(&self) -> usize {
        let v: u32;
        unsafe {
            asm!("mrc p15, 0, {0}, c2, c0, 0", out(reg) v, options(nomem, nostack, preserves_flags));
        }
        v as usize
    }

    fn read_ttbr1(&self) -> usize {
        let v: u32;
        unsafe {
            asm!("mrc p15, 0, {0}, c2, c0, 1", out(reg) v, options(nomem, nostack, preserves_flags));
        }
        v as usize
    }

    fn tlb_invalidate_all(&self) {
        unsafe {
            asm!(
                "mov r0, #0",
                "mcr p15, 0, r0, c8, c7, 0",
                out("r0") _,
                options(nostack, preserves_flags)
            );
        }
        self.dsb();
        self.isb();
    }

    fn tlb_invalidate_addr(&self, vaddr: usize) {
        unsafe {
            asm!("mcr p15, 0, {0}, c8, c7, 1", in(reg) vaddr as u32, options(nostack, preserves_flags));
        }
        self.dsb();
        self.isb();
    }

    fn icache_invalidate_all(&self) {
        unsafe {
            asm!(
                "mov r0, #0",
                "mcr p15, 0, r0, c7, c5, 0",
                out("r0") _,
                options(nostack, preserves_flags)
            );
        }
    }

    fn dsb(&self) {
        unsafe {
            asm!("dsb", options(nomem, nostack, preserves_flags));
        }
    }

    fn isb(&self) {
        unsafe {
            asm!("isb", options(nomem, nostack, preserves_flags));
        }
    }
}
