//! Bounded token relay between workers
//!
//! In the shared modes every worker publishes the token of each finished
//! iteration and must take one token (from anyone) before starting its next
//! iteration. The relay is a bounded MPMC channel whose capacity equals the
//! worker count, so it doubles as a counting semaphore.
//!
//! Each worker holds at most one unconsumed token of its own in the channel
//! (publish after iteration k, take before iteration k + 1), so with capacity
//! = worker count a publish never waits for long, and a taker never waits
//! forever: whenever some worker is blocked in [`TokenRing::take`], its own
//! last token is still queued or already taken by a running worker.

use crate::Result;
use crossbeam::channel::{bounded, Receiver, Sender};

/// Opaque token relayed between workers
pub type Token = String;

/// Cloneable handle to the shared token channel
#[derive(Debug, Clone)]
pub struct TokenRing {
    sender: Sender<Token>,
    receiver: Receiver<Token>,
    capacity: usize,
}

impl TokenRing {
    /// Create a relay holding at most `capacity` tokens
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Block until a token is available and take it
    pub fn take(&self) -> Result<Token> {
        self.receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("token channel disconnected"))
    }

    /// Publish a token, blocking while the channel is full
    pub fn publish(&self, token: Token) -> Result<()> {
        self.sender
            .send(token)
            .map_err(|_| anyhow::anyhow!("token channel disconnected"))
    }

    /// Tokens currently queued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
