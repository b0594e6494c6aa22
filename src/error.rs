//! Recoverable error kinds produced by the memory and dispatch core.
//!
//! Programmer-error classes (`UnsupportedMode`, `InvalidFree`,
//! `NestedOverflow`) never flow through this type — they go straight to
//! [`crate::panic::panic`].

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// C1: no contiguous run of free frames satisfies the request.
    NoMemory,
    /// C2: attempt to map over a present leaf.
    AlreadyMapped,
    /// C2: query/unmap where no leaf exists.
    NotMapped,
    /// C3: no free virtual-address run in the context.
    NoSpace,
    /// C4: no free block large enough.
    HeapFull,
    /// C5: key outside the vendor interrupt-controller range.
    InvalidIrq,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KernelError::NoMemory => "no free physical memory",
            KernelError::AlreadyMapped => "virtual address already mapped",
            KernelError::NotMapped => "virtual address not mapped",
            KernelError::NoSpace => "no free virtual address range",
            KernelError::HeapFull => "kernel heap exhausted",
            KernelError::InvalidIrq => "irq key outside controller range",
        };
        f.write_str(s)
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
