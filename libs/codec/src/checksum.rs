//! Checksum algorithms for the checksum layer
//!
//! Algorithms are pure functions of the covered bytes. The result type fixes
//! the width of the checksum field on the wire.

use std::marker::PhantomData;
use strata_types::WireInt;

/// Computes the value stored in a checksum field
pub trait ChecksumAlgorithm {
    type Value: WireInt;

    /// Algorithm name for logs
    const NAME: &'static str;

    fn compute(&self, bytes: &[u8]) -> Self::Value;
}

/// Wrapping sum of all bytes, truncated to the width of `T`
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSum<T> {
    _width: PhantomData<T>,
}

impl<T> BasicSum<T> {
    pub fn new() -> Self {
        Self {
            _width: PhantomData,
        }
    }
}

impl<T: WireInt> ChecksumAlgorithm for BasicSum<T> {
    type Value = T;

    const NAME: &'static str = "basic_sum";

    fn compute(&self, bytes: &[u8]) -> T {
        let sum = bytes
            .iter()
            .fold(0u64, |acc, byte| acc.wrapping_add(u64::from(*byte)));
        T::from_u64_truncating(sum)
    }
}

/// CRC32 (IEEE) over the covered bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32;

impl ChecksumAlgorithm for Crc32 {
    type Value = u32;

    const NAME: &'static str = "crc32";

    fn compute(&self, bytes: &[u8]) -> u32 {
        crc32fast::hash(bytes)
    }
}
