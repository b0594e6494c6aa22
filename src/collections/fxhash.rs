//! A small, fixed-seed hasher for [`hashbrown::HashMap`].
//!
//! This crate's `hashbrown` dependency disables its default `ahash`
//! hasher (no OS entropy source exists this early in boot to seed a
//! `RandomState`), so every map needs an explicit, `no_std`-safe
//! `BuildHasher`. The multiply-xor mix below is the well-known
//! "FxHash" algorithm (used by `rustc` and `firefox` for exactly this
//! reason): fast, not DoS-resistant, fine for kernel-internal keys
//! that are never attacker-controlled.

use core::hash::Hasher;
use core::ops::BitXor;

const SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

pub struct FxHasher {
    hash: u64,
}

impl Default for FxHasher {
    fn default() -> Self {
        FxHasher { hash: 0 }
    }
}

impl FxHasher {
    #[inline]
    fn write_u64(&mut self, word: u64) {
        self.hash = (self.hash.rotate_left(5).bitxor(word)).wrapping_mul(SEED);
    }
}

impl Hasher for FxHasher {
    fn write(&mut self, mut bytes: &[u8]) {
        while bytes.len() >= 8 {
            let (chunk, rest) = bytes.split_at(8);
            self.write_u64(u64::from_ne_bytes(chunk.try_into().unwrap()));
            bytes = rest;
        }
        if !bytes.is_empty() {
            let mut buf = [0u8; 8];
            buf[..bytes.len()].copy_from_slice(bytes);
            self.write_u64(u64::from_ne_bytes(buf));
        }
    }

    fn write_u32(&mut self, i: u32) {
        self.write_u64(i as u64);
    }

    fn write_u64(&mut self, i: u64) {
        FxHasher::write_u64(self, i);
    }

    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    fn finish(&self) -> u64 {
        self.hash
    }
}

pub type FxBuildHasher = core::hash::BuildHasherDefault<FxHasher>;
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
