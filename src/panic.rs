//! Fatal-error path for programmer-error classes.
//!
//! Grounded on `examples/original_source/kernel/kernel/panic.c`: mask IRQs,
//! emit the message over the console, and halt. There is no exit.

use core::fmt::Write;

use crate::arch;
use crate::console::ConsoleWriter;

/// Enter the fatal path: mask interrupts, print `msg`, and halt forever.
///
/// Called for `UnsupportedMode`, `InvalidFree`, and `NestedOverflow` —
/// the three error kinds spec.md classifies as programmer errors rather
/// than recoverable conditions.
///
/// Under `cfg(test)`/the `sim` feature this unwinds via `core::panic!`
/// instead of halting, so `#[should_panic]` and `catch_unwind` can
/// observe it on the host — the real target never returns either way.
pub fn panic(msg: &str) -> ! {
    arch::ops().disable_irqs();
    crate::console::print("\n[panic] ");
    crate::console::print(msg);
    crate::console::print("\n");
    #[cfg(any(test, feature = "sim"))]
    {
        panic!("{}", msg);
    }
    #[cfg(not(any(test, feature = "sim")))]
    loop {
        arch::ops().wait_for_event();
    }
}

#[cfg(not(any(test, feature = "sim")))]
#[panic_handler]
fn rust_panic_handler(info: &core::panic::PanicInfo) -> ! {
    arch::ops().disable_irqs();
    let mut w = ConsoleWriter;
    let _ = write!(w, "\n[rust panic] {}\n", info);
    loop {
        arch::ops().wait_for_event();
    }
}
