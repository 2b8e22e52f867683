//! Sequence tracking for reliable transaction submission
//!
//! Handles:
//! - Per-account belief about the next usable sequence
//! - Lazy fetch from the node when no belief is held
//! - Invalidation after failures so the next attempt re-reads ground truth

use crate::error::RelayerResult;
use crate::node::LedgerNode;

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-account sequence store.
///
/// Values are beliefs, not ground truth: the node's own sequence check is
/// authoritative. Operations on the same address are not mutually exclusive.
pub trait SequenceCache: Send + Sync {
    /// Cached next sequence for `address`, if any
    fn read(&self, address: &str) -> Option<u32>;

    /// Overwrite the cached value
    fn write(&self, address: &str, value: u32);

    /// Drop the cached value; idempotent
    fn clear(&self, address: &str);
}

/// Process-local sequence cache
#[derive(Default)]
pub struct InMemorySequenceCache {
    entries: DashMap<String, Option<u32>>,
}

impl InMemorySequenceCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceCache for InMemorySequenceCache {
    fn read(&self, address: &str) -> Option<u32> {
        self.entries.get(address).and_then(|entry| *entry)
    }

    fn write(&self, address: &str, value: u32) {
        self.entries.insert(address.to_string(), Some(value));
    }

    fn clear(&self, address: &str) {
        if let Some(mut entry) = self.entries.get_mut(address) {
            *entry = None;
        }
    }
}

/// Produces the sequence to stamp on the next attempt for an account
pub struct SequenceResolver {
    cache: Arc<dyn SequenceCache>,
}

impl SequenceResolver {
    /// Create a new resolver over the given cache
    pub fn new(cache: Arc<dyn SequenceCache>) -> Self {
        Self { cache }
    }

    /// Cached value if present, otherwise fetched from the node and cached.
    ///
    /// Fetch errors are returned unchanged.
    pub async fn resolve<N>(&self, address: &str, node: &N) -> RelayerResult<u32>
    where
        N: LedgerNode + ?Sized,
    {
        if let Some(sequence) = self.cache.read(address) {
            crate::metrics::record_sequence_cache_hit();
            return Ok(sequence);
        }

        let sequence = node.fetch_sequence(address).await?;
        crate::metrics::record_sequence_fetch();
        self.cache.write(address, sequence);

        debug!("Fetched sequence {} for {}", sequence, address);
        Ok(sequence)
    }

    /// Current belief for an account
    pub fn get(&self, address: &str) -> Option<u32> {
        self.cache.read(address)
    }

    /// Record that `used` was accepted; the next transaction must use `used + 1`.
    ///
    /// A sequence with no successor clears the entry instead.
    pub fn advance(&self, address: &str, used: u32) {
        match used.checked_add(1) {
            Some(next) => {
                self.cache.write(address, next);
                debug!("Advanced sequence for {} to {}", address, next);
            }
            None => {
                warn!("Sequence {} for {} has no successor, clearing", used, address);
                self.cache.clear(address);
            }
        }
    }

    /// Forget the belief so the next resolution re-fetches from the node
    pub fn invalidate(&self, address: &str) {
        self.cache.clear(address);
        debug!("Invalidated sequence for {}", address);
    }
}
