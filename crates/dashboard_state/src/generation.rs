//! Request generations.
//!
//! Every refresh takes a new generation before it goes out; its response
//! is applied only if no newer refresh has been issued since. Overlapping
//! requests therefore cannot overwrite newer state with older data,
//! whatever order they complete in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next generation. Earlier ones stop being current.
    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::SeqCst) == generation
    }
}

/// What happened to one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
    /// A newer refresh was issued before this one completed; its result
    /// was dropped.
    Superseded,
}
