//! Write payload buffer
//!
//! Every write in a run sends the same payload: bytes `0, 1, ..., 127`
//! repeating for the configured length. The buffer is built once before any
//! worker starts and shared read-only between all of them.

use std::ops::Deref;
use std::sync::Arc;

/// Length of the repeating byte sequence
pub const PATTERN_PERIOD: usize = 128;

/// Expected payload byte at a given offset
#[inline(always)]
pub fn pattern_byte(offset: usize) -> u8 {
    (offset % PATTERN_PERIOD) as u8
}

/// Immutable payload shared by all workers of a run
///
/// Cloning is cheap (reference count bump).
#[derive(Debug, Clone)]
pub struct PayloadBuffer {
    bytes: Arc<[u8]>,
}

impl PayloadBuffer {
    /// Build a payload of `size` bytes filled with the repeating pattern
    pub fn new(size: usize) -> Self {
        let bytes: Vec<u8> = (0..size).map(pattern_byte).collect();
        Self {
            bytes: bytes.into(),
        }
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Deref for PayloadBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Check that `data` holds the payload pattern from offset 0
///
/// Returns `Err(offset)` with the first mismatched byte offset.
pub fn verify_pattern(data: &[u8]) -> Result<(), usize> {
    match data
        .iter()
        .enumerate()
        .find(|&(i, &byte)| byte != pattern_byte(i))
    {
        Some((offset, _)) => Err(offset),
        None => Ok(()),
    }
}
