//! Keeping only the newest graph when builds finish out of order.
//!
//! Each message-set snapshot gets a generation from [`GenerationCounter`]
//! before its build starts. [`LatestGraph::publish`] accepts a finished
//! graph only if its generation is newer than the one already stored, so a
//! slow build for an old snapshot can never replace a newer result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::types::ClusterGraph;

/// Hands out strictly increasing generation numbers, starting at 1.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    last: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently issued generation, 0 if none.
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

/// Shared slot for the most recent graph. Starts empty at generation 0.
#[derive(Debug, Clone, Default)]
pub struct LatestGraph {
    inner: Arc<RwLock<Published>>,
}

#[derive(Debug, Default)]
struct Published {
    generation: u64,
    graph: Arc<ClusterGraph>,
}

impl LatestGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `graph` if `generation` is newer than the stored one.
    ///
    /// Returns false, leaving the slot untouched, for a stale generation.
    pub fn publish(&self, generation: u64, graph: ClusterGraph) -> bool {
        let mut published = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if generation <= published.generation {
            debug!(
                generation,
                current = published.generation,
                "Discarding stale cluster graph"
            );
            return false;
        }
        published.generation = generation;
        published.graph = Arc::new(graph);
        true
    }

    /// The stored graph and its generation.
    pub fn get(&self) -> (u64, Arc<ClusterGraph>) {
        let published = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (published.generation, Arc::clone(&published.graph))
    }

    pub fn generation(&self) -> u64 {
        self.get().0
    }
}
