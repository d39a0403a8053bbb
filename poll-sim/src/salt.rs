//! Pluggable salt generation (SPEC_FULL.md §5): production code draws from
//! the OS RNG, deterministic tests draw from a counter, and every call site
//! in the crate is written against the `SaltSource` trait so it cannot tell
//! which one it got.

use crate::field::Fr;
use ark_ff::PrimeField;
use rand::RngCore;

pub trait SaltSource {
    fn next_salt(&mut self) -> Fr;
}

/// The production default: 32 bytes of OS randomness reduced mod the field.
pub struct OsRngSaltSource<R: RngCore> {
    rng: R,
}

impl<R: RngCore> OsRngSaltSource<R> {
    pub fn new(rng: R) -> Self {
        OsRngSaltSource { rng }
    }
}

impl<R: RngCore> SaltSource for OsRngSaltSource<R> {
    fn next_salt(&mut self) -> Fr {
        let mut bytes = [0u8; 32];
        self.rng.fill_bytes(&mut bytes);
        Fr::from_le_bytes_mod_order(&bytes)
    }
}

/// A deterministic, strictly increasing salt source for reproducible tests.
pub struct CounterSaltSource {
    next: u64,
}

impl CounterSaltSource {
    pub fn new() -> Self {
        CounterSaltSource { next: 1 }
    }

    pub fn starting_at(seed: u64) -> Self {
        CounterSaltSource { next: seed }
    }
}

impl Default for CounterSaltSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SaltSource for CounterSaltSource {
    fn next_salt(&mut self) -> Fr {
        let salt = Fr::from(self.next);
        self.next += 1;
        salt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_source_never_repeats_within_a_run() {
        let mut source = CounterSaltSource::new();
        let a = source.next_salt();
        let b = source.next_salt();
        assert_ne!(a, b);
    }
}
