//! Post-run scratch file verification
//!
//! After a run, every worker file that received at least one write must be
//! exactly `payload_bytes` long and hold the repeating payload pattern. Files
//! are checked in parallel with rayon.

use crate::util::buffer::verify_pattern;
use crate::Result;
use anyhow::Context;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Verification result for a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// Size and content match
    Success,
    /// File length differs from the payload size
    SizeMismatch { expected: u64, actual: u64 },
    /// Content differs from the pattern
    Failure {
        /// Offset of first mismatch
        offset: usize,
        /// Expected value
        expected: u8,
        /// Actual value
        actual: u8,
    },
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Verify one scratch file against the payload pattern
pub fn verify_file(path: &Path, payload_bytes: usize) -> Result<VerificationResult> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if data.len() != payload_bytes {
        return Ok(VerificationResult::SizeMismatch {
            expected: payload_bytes as u64,
            actual: data.len() as u64,
        });
    }

    Ok(match verify_pattern(&data) {
        Ok(()) => VerificationResult::Success,
        Err(offset) => VerificationResult::Failure {
            offset,
            expected: crate::util::buffer::pattern_byte(offset),
            actual: data[offset],
        },
    })
}

/// Verify several files in parallel
///
/// Results come back in the same order as `paths`.
pub fn verify_files(
    paths: &[PathBuf],
    payload_bytes: usize,
) -> Result<Vec<(PathBuf, VerificationResult)>> {
    paths
        .par_iter()
        .map(|path| -> Result<(PathBuf, VerificationResult)> {
            Ok((path.clone(), verify_file(path, payload_bytes)?))
        })
        .collect()
}
