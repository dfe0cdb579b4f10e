//! Synchronization primitives shared between workers

pub mod spin;
pub mod token_ring;

pub use spin::{SpinLock, SpinLockGuard};
pub use token_ring::{Token, TokenRing};
