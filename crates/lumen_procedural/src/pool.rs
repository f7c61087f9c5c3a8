// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-thread graph clones for concurrent evaluation.

use crate::graph::Graph;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

struct PoolEntry {
    epoch: u64,
    graph: Graph,
}

/// Hands each evaluating thread a private clone of a template graph.
///
/// Node evaluation mutates per-pass caches, so a graph must never be
/// evaluated by two threads at once. The pool keeps one clone per thread,
/// created lazily on first use and reused across calls. Editing the
/// template bumps an epoch counter; stale clones are discarded and rebuilt
/// from the template the next time their thread asks for one.
///
/// A thread's clone is removed from the pool while it is in use, so a
/// nested [`with`](GraphPool::with) on the same thread simply works on a
/// second clone.
pub struct GraphPool {
    template: Mutex<Graph>,
    epoch: AtomicU64,
    clones: Mutex<HashMap<ThreadId, PoolEntry>>,
}

impl GraphPool {
    /// Create a pool around a template graph.
    pub fn new(template: Graph) -> Self {
        Self {
            template: Mutex::new(template),
            epoch: AtomicU64::new(0),
            clones: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` with this thread's private clone of the template.
    pub fn with<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        let id = thread::current().id();
        let current = self.epoch.load(Ordering::Acquire);
        let entry = self.clones.lock().remove(&id);
        let mut graph = match entry {
            Some(entry) if entry.epoch == current => entry.graph,
            _ => self.template.lock().duplicate(),
        };
        let result = f(&mut graph);
        self.clones.lock().insert(
            id,
            PoolEntry {
                epoch: current,
                graph,
            },
        );
        result
    }

    /// Run `f` with the template graph, then invalidate every clone.
    pub fn edit_template<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        let mut template = self.template.lock();
        let result = f(&mut template);
        self.invalidate();
        result
    }

    /// Replace the template graph, invalidating every clone.
    pub fn set_template(&self, template: Graph) {
        *self.template.lock() = template;
        self.invalidate();
    }

    /// Drop all cached clones. They are rebuilt on demand.
    pub fn invalidate(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::Release) + 1;
        self.clones.lock().clear();
        tracing::debug!(epoch, "template changed, dropped cached graph clones");
    }

    /// Number of cached clones (for diagnostics).
    pub fn clone_count(&self) -> usize {
        self.clones.lock().len()
    }
}

impl std::fmt::Debug for GraphPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphPool")
            .field("epoch", &self.epoch.load(Ordering::Relaxed))
            .field("clones", &self.clone_count())
            .finish()
    }
}
