//! External collaborators the core consumes but does not implement (§1, §6): the
//! time-series storage backend, query/time-string parsing. Named here as traits only, so
//! that `Node` implementations can be written against a stable interface without pulling in
//! a concrete backend.

use crate::error::PipelineError;
use crate::node::{Node, NodeKind};
use crate::series::{IdKind, TimeSeriesId};
use crate::time::TimeStamp;
use std::sync::Arc;

/// `TimeParser` (§6): turns a time expression plus a time zone into a `TimeStamp`. Query
/// and time-string parsing are out of scope (§1); this trait exists only so interior code
/// that needs "now" semantics (an absent query end time) can be written generically.
pub trait TimeParser: Send + Sync {
    fn parse(&self, text: &str, time_zone: &str) -> Result<TimeStamp, PipelineError>;
}

/// `DataStore` (§6): a leaf collaborator that emits `Result`s to a node via the same
/// `on_next`/`on_complete`/`on_error` vocabulary every node uses. A `DataStoreFactory`
/// produces one of these per time-series id.
pub trait DataStore: Send + Sync {
    fn id_kind(&self) -> IdKind;

    /// Drives `sink`'s `on_next`/`on_complete`/`on_error` with this store's results. The
    /// core does not prescribe how (blocking call, background thread, etc), only that the
    /// sink's calls arrive in `sequence_id` order (§5 "Ordering").
    fn run(&self, sink: Arc<dyn Node>);
}

/// `DataStoreFactory` (§6): `open(id) -> DataStore`, plus introspection the query planner
/// uses to decide whether a node's work can be pushed down into the store.
pub trait DataStoreFactory: Send + Sync {
    fn open(&self, id: &TimeSeriesId) -> Result<Arc<dyn DataStore>, PipelineError>;
    fn id_kind(&self) -> IdKind;
    fn supports_pushdown(&self, kind: NodeKind) -> bool;
}

/// A one-shot initialization primitive for a process-wide singleton (§5, §9): replaces
/// double-checked locking with `OnceCell`'s safe publish-once semantics. The data-store
/// factory is the canonical user, constructed once, read-only thereafter, shared by every
/// pipeline regardless of which thread it runs on.
pub struct Singleton<T> {
    cell: once_cell::sync::OnceCell<Arc<T>>,
}

impl<T> Singleton<T> {
    pub const fn new() -> Self {
        Singleton {
            cell: once_cell::sync::OnceCell::new(),
        }
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Arc<T> {
        Arc::clone(self.cell.get_or_init(|| Arc::new(init())))
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().map(Arc::clone)
    }
}

impl<T> Default for Singleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_only_initializes_once() {
        let singleton: Singleton<u32> = Singleton::new();
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let a = singleton.get_or_init(|| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            42
        });
        let b = singleton.get_or_init(|| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            7
        });
        assert_eq!(*a, 42);
        assert_eq!(*b, 42);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
