//! Per-iteration unit of work
//!
//! One work unit:
//!
//! 1. decides whether this iteration writes (probability = write ratio)
//! 2. feeds `hash_rounds` freshly drawn random numbers, as text, into a
//!    SHA-512/256 state
//! 3. on a write, overwrites the payload at offset 0 of the worker's file
//! 4. finalizes the digest, under the shared spin lock if one is given
//!
//! The hex digest is returned as the token relayed between workers. Its value
//! carries no meaning; it only forces real, non-elidable CPU work.
//!
//! The hashing cost does not depend on the write decision: the decision is
//! drawn first, and the same number of rounds runs either way.

use crate::sync::SpinLock;
use rand::Rng;
use sha2::{Digest, Sha512_256};
use std::fmt::Write as _;
use std::io::{self, Seek, SeekFrom, Write};

/// What happened to the optional write of a work unit
#[derive(Debug)]
pub enum WriteOutcome {
    /// The write decision came out false
    Skipped,
    /// The full payload was written at offset 0
    Written,
    /// The write was attempted and failed
    Failed(io::Error),
}

/// Result of one work unit
#[derive(Debug)]
pub struct WorkOutcome {
    /// Lower-case hex SHA-512/256 digest
    pub token: String,
    pub write: WriteOutcome,
}

/// Parameters of a work unit, fixed for the whole run
#[derive(Debug, Clone, Copy)]
pub struct WorkUnit<'a> {
    /// Write probability in percent, within [0, 100]
    pub write_ratio: f64,
    pub hash_rounds: usize,
    pub payload: &'a [u8],
    /// Held while the digest is finalized
    pub lock: Option<&'a SpinLock>,
}

impl<'a> WorkUnit<'a> {
    /// Run one iteration of CPU work against `file`
    pub fn consume_cpu<R, F>(&self, rng: &mut R, file: &mut F) -> WorkOutcome
    where
        R: Rng + ?Sized,
        F: Write + Seek + ?Sized,
    {
        let is_write = should_write(rng, self.write_ratio);

        let mut hasher = Sha512_256::new();
        let mut text = String::with_capacity(16);
        for _ in 0..self.hash_rounds {
            text.clear();
            // Writing into a String cannot fail
            let _ = write!(text, "{:.6}", rng.gen::<f64>());
            hasher.update(text.as_bytes());
        }

        let write = if is_write {
            match overwrite(file, self.payload) {
                Ok(()) => WriteOutcome::Written,
                Err(e) => WriteOutcome::Failed(e),
            }
        } else {
            WriteOutcome::Skipped
        };

        let token = {
            let _guard = self.lock.map(SpinLock::lock);
            hex::encode(hasher.finalize())
        };

        WorkOutcome { token, write }
    }
}

/// Draw the per-iteration write decision
///
/// 100 always writes and 0 never does, without consuming a random number for
/// 100. Any other ratio draws one uniform value in [0, 1) and writes if it is
/// at most `ratio / 100`.
#[inline]
pub fn should_write<R: Rng + ?Sized>(rng: &mut R, write_ratio: f64) -> bool {
    if write_ratio >= 100.0 {
        return true;
    }
    let draw: f64 = rng.gen();
    write_ratio > 0.0 && draw <= write_ratio / 100.0
}

/// Overwrite `payload` in place at the start of `file`
fn overwrite<F: Write + Seek + ?Sized>(file: &mut F, payload: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(payload)
}
