//! Subsystem-tagged trace macros.
//!
//! Compiled to nothing unless the `klog-trace` feature is enabled, mirroring
//! the teacher's compile-time debug toggles (e.g. `DEBUG_FRAME_TRACKING`)
//! and the original C sources' `#if defined(PRINT_MM_PHYS)` blocks.

#[macro_export]
macro_rules! klog {
    ($tag:literal, $($arg:tt)*) => {{
        #[cfg(feature = "klog-trace")]
        {
            $crate::console::print(concat!("[", $tag, "] "));
            $crate::console::print(&alloc::format!($($arg)*));
            $crate::console::print("\n");
        }
        #[cfg(not(feature = "klog-trace"))]
        {
            let _ = core::format_args!($($arg)*);
        }
    }};
}
