//! ARMv6/v7 short-descriptor format: two levels, 1 MiB sections resolved
//! down to 4 KiB pages.
//!
//! Real hardware's L1 is a 16 KiB, 4096-entry table (`VA[31:20]`) and each
//! L2 is a 1 KiB, 256-entry table (`VA[19:12]`), four of which normally
//! share one 4 KiB page. This implementation gives every table — L1
//! included — a whole number of dedicated frames instead of packing
//! multiple L2s per page; see DESIGN.md for why that's an acceptable
//! trade for a hosted-simulator target that never touches real silicon.

use super::geometry::LevelSpec;

pub const LEVELS: [LevelSpec; 2] = [
    LevelSpec { index_shift: 20, index_bits: 12, frames_per_table: 8 }, // L1: 4096 entries
    LevelSpec { index_shift: 12, index_bits: 8, frames_per_table: 1 },  // L2: 256 entries
];

pub fn top_level_frames() -> usize {
    LEVELS[0].frames_per_table
}
