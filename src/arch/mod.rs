//! Architecture primitives, isolated behind a small trait so the core
//! components (C1–C5) never touch `asm!` directly.
//!
//! Grounded on the teacher's pattern of wrapping all unsafe MMIO/asm access
//! behind small driver structs (`Gic`, the UART) with the rest of the code
//! calling safe methods. Here the "driver" is the CPU itself: TTBR
//! read/write, TLB/I-cache invalidation, barriers, and interrupt masking.
//!
//! Two backends exist:
//! - [`armv`]: real ARMv6/v7 `asm!`, compiled for `target_arch = "arm"`.
//! - [`sim`]: a hosted fake used by `cfg(test)` and the `sim` feature, so
//!   every property test in spec.md §8 can run on the host ("hosted-
//!   simulator tests on a stubbed MMU").

#[cfg(not(any(test, feature = "sim")))]
mod armv;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

/// Arch-level operations every backend must provide.
///
/// All methods are infallible from the caller's point of view: a backend
/// that cannot perform an operation (e.g. an unsupported mode probed at
/// init) is a fatal condition handled by the caller via
/// [`crate::panic::panic`], not by this trait.
pub trait ArchOps: Sync {
    /// Raw VMSA support field read from `MMFR0[3:0]`. The page-table
    /// engine (C2), not this trait, decides which `MmuMode` that
    /// corresponds to and whether it's supported — this trait only
    /// exposes the hardware read.
    fn mmfr0_vmsa(&self) -> u32;

    fn disable_irqs(&self);
    fn enable_irqs(&self);
    /// Halt until the next event/interrupt (`wfe`).
    fn wait_for_event(&self);

    fn write_ttbr0(&self, table_phys: usize);
    fn write_ttbr1(&self, table_phys: usize);
    fn read_ttbr0(&self) -> usize;
    fn read_ttbr1(&self) -> usize;

    fn tlb_invalidate_all(&self);
    fn tlb_invalidate_addr(&self, vaddr: usize);
    fn icache_invalidate_all(&self);

    fn dsb(&self);
    fn isb(&self);
}

#[cfg(not(any(test, feature = "sim")))]
static BACKEND: armv::ArmOps = armv::ArmOps;
#[cfg(any(test, feature = "sim"))]
static BACKEND: sim::SimOps = sim::SimOps;

/// The active architecture backend.
pub fn ops() -> &'static dyn ArchOps {
    &BACKEND
}
