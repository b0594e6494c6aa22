//! ARMv7 LPAE (Large Physical Address Extension): three levels, short
//! enough per-level to fit `ttbr0_size = ttbr1_size = 1` (one top-level
//! table per half of the address space, as spec.md §3 describes).

use super::geometry::LevelSpec;

pub const LEVELS: [LevelSpec; 3] = [
    LevelSpec { index_shift: 30, index_bits: 2, frames_per_table: 1 }, // PGD: 4 entries
    LevelSpec { index_shift: 21, index_bits: 9, frames_per_table: 1 }, // PMD: 512 entries
    LevelSpec { index_shift: 12, index_bits: 9, frames_per_table: 1 }, // PTE: 512 entries
];

pub fn top_level_frames() -> usize {
    LEVELS[0].frames_per_table
}
