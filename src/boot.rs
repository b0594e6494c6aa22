//! Boot code for ARMv6/v7 (Raspberry Pi 1/2/Zero).
//!
//! Unlike the teacher's AArch64 trampoline, nothing here sets up page
//! tables or enables the MMU in assembly: that work moved entirely to
//! Rust, in [`crate::mm::context::VirtualMemory::init`] (C3), which
//! builds the kernel's real page tables through the C2 engine instead
//! of a throwaway boot-time identity map. This routine's only job is
//! to get from the reset vector to a valid SVC-mode stack and jump to
//! [`rust_start`], passing the ATAGS/DTB pointer `_start` was handed.
//!
//! Grounded on `examples/original_source/src/boot/arch/arm/v7/mm/virt.c`
//! for the board's boot-time register conventions (`r0`..`r2` hold the
//! boot loader's machine ID and ATAGS/DTB pointer on entry), with the
//! actual `global_asm!` trampoline shape kept from the teacher's
//! AArch64 `_boot`.

use core::arch::global_asm;

/// Physical load address this image is linked for (RPi1/Zero SDRAM base).
pub const KERNEL_PHYS_BASE: usize = 0x0000_8000;

global_asm!(
    r#"
.section .text._boot
.global _boot

.equ STACK_SIZE, 0x4000 // 16KiB boot stack, replaced by the real kernel stack after init

_boot:
    // r0 = 0 (or board ID on some loaders), r1 = machine type, r2 = ATAGS/DTB pointer.
    // Only the DTB pointer in r2 survives to Rust.
    mov     r4, r2

    // Early stack, growing down from the end of this image's BSS.
    ldr     sp, =_boot_stack_top

    // Zero BSS before any Rust code runs static-initialised globals.
    ldr     r0, =__bss_start
    ldr     r1, =__bss_end
    mov     r2, #0
clear_bss:
    cmp     r0, r1
    bge     bss_cleared
    str     r2, [r0], #4
    b       clear_bss
bss_cleared:

    mov     r0, r4
    bl      rust_start

hang:
    wfe
    b       hang

.section .bss._boot_stack
.balign 16
.space STACK_SIZE
_boot_stack_top:
"#
);
