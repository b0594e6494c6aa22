//! C5: dispatch fabric, spec.md §4.5.
//!
//! Grounded on `examples/original_source/src/core/interrupt/interrupt.c`
//! (per-domain AVL tree of `(handler, post)` callback lists keyed by
//! interrupt number) and `examples/original_source/src/core/event.c`
//! (the same shape keyed by event type instead), generalised into one
//! table keyed by `(Domain, u32)` shared by both callers — spec.md's "one
//! fabric, two users" framing.
//!
//! Callback lists are snapshotted out from under the lock before being
//! invoked (see [`crate::kernel_core`]), the same lock-copy-then-call
//! shape `examples/netoneko-akuma/src/irq.rs`'s `dispatch_irq` uses to
//! let a handler re-register without deadlocking on its own table.

use alloc::vec::Vec;

use crate::collections::FxHashMap;

/// A bound callback: `(key, data)`.
pub type Callback = fn(u32, usize);

/// Which subsystem a `(domain, key)` pair belongs to. Normal/fast/software
/// interrupts and the event bus each get their own key space even though
/// they share one table and one matching algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    IrqNormal,
    IrqFast,
    IrqSoftware,
    Event,
}

#[derive(Default)]
struct Entry {
    pre: Vec<Callback>,
    post: Vec<Callback>,
}

/// Table of `(domain, key) -> (pre callbacks, post callbacks)`.
#[derive(Default)]
pub struct Dispatcher {
    table: FxHashMap<(Domain, u32), Entry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher { table: FxHashMap::default() }
    }

    /// Bind `callback` for `(domain, key)`. A duplicate (same callback,
    /// same list) is a no-op, matching the original's "already bound"
    /// check in `event_bind`/`interrupt_register_handler`.
    pub fn register(&mut self, domain: Domain, key: u32, callback: Callback, post: bool) {
        let entry = self.table.entry((domain, key)).or_default();
        let list = if post { &mut entry.post } else { &mut entry.pre };
        if !list.contains(&callback) {
            list.push(callback);
        }
    }

    /// Remove `callback` from `(domain, key)` if bound. No-op if absent.
    /// Drops the `(domain, key)` entry entirely once both its pre and
    /// post lists are empty, rather than leaving a dangling empty block.
    pub fn unregister(&mut self, domain: Domain, key: u32, callback: Callback, post: bool) {
        let Some(entry) = self.table.get_mut(&(domain, key)) else { return };
        let list = if post { &mut entry.post } else { &mut entry.pre };
        list.retain(|c| *c != callback);
        if entry.pre.is_empty() && entry.post.is_empty() {
            self.table.remove(&(domain, key));
        }
    }

    /// Snapshot of the pre and post callback lists bound to `(domain,
    /// key)`, for the caller to invoke after releasing whatever lock
    /// guards this dispatcher.
    pub fn snapshot(&self, domain: Domain, key: u32) -> (Vec<Callback>, Vec<Callback>) {
        match self.table.get(&(domain, key)) {
            Some(entry) => (entry.pre.clone(), entry.post.clone()),
            None => (Vec::new(), Vec::new()),
        }
    }

    /// Run every pre callback then every post callback bound to `(domain,
    /// key)` with `data`, without the snapshot/release-lock step. Used
    /// directly by tests and by call sites that already know no handler
    /// will try to register against this same domain reentrantly.
    pub fn dispatch(&self, domain: Domain, key: u32, data: usize) {
        let (pre, post) = self.snapshot(domain, key);
        for cb in pre {
            cb(key, data);
        }
        for cb in post {
            cb(key, data);
        }
    }

    #[cfg(test)]
    pub fn table_len(&self) -> usize {
        self.table.len()
    }
}
