//! Memory management: C1 (frames), C2 (page tables), C3 (virtual memory
//! facade).

pub mod context;
pub mod entry;
pub mod frame;
pub mod geometry;
pub mod lpae;
pub mod pagetable;
pub mod short;
pub mod table_store;
