//! Entry point. [`crate::boot`]'s assembly trampoline hands control to
//! [`rust_start`] with a DTB pointer in `r0`, already on a valid stack
//! with BSS zeroed.

#![no_std]
#![no_main]

use ignis_kernel::{allocator, api, arch, console, kernel_core, klog};

unsafe extern "C" {
    static __kernel_end: u8;
}

/// Fall back to a single 128 MiB bank (the smallest RPi1 configuration)
/// when the DTB carries no usable `memory` node, so boot can still
/// proceed far enough to print the reason it's running degraded.
const FALLBACK_RAM_BYTES: usize = 128 * 1024 * 1024;

struct RamInfo {
    total_bytes: usize,
    initrd: Option<(usize, usize)>,
}

/// Parse the DTB boot-loaders pass in for total RAM and an optional
/// initrd range. Grounded on the `fdt` crate's read-only device-tree
/// walk; a malformed or absent DTB degrades to [`FALLBACK_RAM_BYTES`]
/// rather than failing boot outright, since this early there is
/// nowhere to report a hard error to besides the UART.
unsafe fn probe_ram(dtb_ptr: *const u8) -> RamInfo {
    let fdt = match unsafe { fdt::Fdt::from_ptr(dtb_ptr) } {
        Ok(fdt) => fdt,
        Err(_) => {
            console::print("[boot] no valid DTB, assuming 128 MiB\n");
            return RamInfo { total_bytes: FALLBACK_RAM_BYTES, initrd: None };
        }
    };

    let total_bytes = fdt
        .memory()
        .regions()
        .map(|r| r.size.unwrap_or(0))
        .sum::<usize>();
    let total_bytes = if total_bytes == 0 { FALLBACK_RAM_BYTES } else { total_bytes };

    let initrd = fdt.find_node("/chosen").and_then(|chosen| {
        let start = chosen.property("linux,initrd-start")?.as_usize()?;
        let end = chosen.property("linux,initrd-end")?.as_usize()?;
        if end > start {
            Some((start, end - start))
        } else {
            None
        }
    });

    RamInfo { total_bytes, initrd }
}

#[unsafe(no_mangle)]
pub extern "C" fn rust_start(dtb_ptr: *const u8) -> ! {
    #[cfg(not(test))]
    allocator::init();

    console::print("\nignis-kernel booting\n");

    let kernel_end = unsafe { core::ptr::addr_of!(__kernel_end) as usize };
    let ram = unsafe { probe_ram(dtb_ptr) };

    klog!("boot", "ram={:#x} kernel_end={:#x} initrd={:?}", ram.total_bytes, kernel_end, ram.initrd);

    kernel_core::init(ram.total_bytes, kernel_end, kernel_end, ram.initrd)
        .unwrap_or_else(|e| panic!("kernel_core::init failed: {e}"));

    api::event_bind(0, |_key, _data| {}, false);

    loop {
        api::event_handle();
        arch::ops().wait_for_event();
    }
}
