//! The abstract `Node` contract (§4.1): lifecycle, upstream/downstream wiring, and
//! error/complete propagation. Concrete node kinds live under [`crate::nodes`].

use crate::error::PipelineError;
use crate::result::QueryResult;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The closed set of node kinds the core ships. Application code registers its own
/// [`crate::registry::NodeFactory`] per kind; this enum is the key the registry dispatches
/// on (§4.3, §9 "explicit mapping ... no reflection").
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum NodeKind {
    SlidingWindow,
    Summarizer,
}

/// Lifecycle and wiring contract every node implements (§4.1). A node does not suspend: it
/// must either emit immediately from `on_next` or buffer internally, since the scheduling
/// model is single-threaded cooperative push (§5).
pub trait Node: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> NodeKind;

    /// Called by upstream `upstream_id` when a `Result` is available. Implementations wrap
    /// the result (typically via [`QueryResult::view_of`]) and forward it with
    /// [`NodeBase::send_downstream`]. Failures during wrapping are reported to this node's
    /// own downstreams via `on_error`, not returned to the caller (§7).
    fn on_next(&self, upstream_id: &str, result: Arc<QueryResult>);

    /// `upstream_id` has produced `total_seq` results in total, the last one being
    /// `final_seq`. Forwarded downstream unchanged.
    fn on_complete(&self, upstream_id: &str, final_seq: u64, total_seq: u64);

    /// `upstream_id` failed with `err`. Propagated as-is downstream; no recovery at this
    /// layer. After this call, this node must not produce further results originating from
    /// `upstream_id`.
    fn on_error(&self, upstream_id: &str, err: PipelineError);

    /// Releases any retained resources. Idempotent.
    fn close(&self);

    /// Wires `downstream` to receive this node's `on_next`/`on_complete`/`on_error` calls
    /// (§4.1 "each node knows its collection of downstreams"). Fan-out is permitted: a node
    /// may have any number of downstreams.
    fn add_downstream(&self, downstream: Arc<dyn Node>);
}

/// Common bookkeeping shared by every transforming node: downstream wiring, per-upstream
/// error tracking, and an idempotent closed flag. Concrete nodes embed one of these and
/// delegate `on_complete`/`on_error`/`close` to its helper methods.
pub struct NodeBase {
    id: String,
    downstreams: Mutex<SmallVec<[Arc<dyn Node>; 2]>>,
    errored_upstreams: Mutex<HashSet<String>>,
    closed: AtomicBool,
    cancellation_observed: AtomicBool,
}

impl NodeBase {
    pub fn new(id: impl Into<String>) -> Self {
        NodeBase {
            id: id.into(),
            downstreams: Mutex::new(SmallVec::new()),
            errored_upstreams: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            cancellation_observed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn add_downstream(&self, downstream: Arc<dyn Node>) {
        self.downstreams.lock().push(downstream);
    }

    /// True once `upstream_id` has reported an error; subsequent `on_next` calls for that
    /// upstream should be ignored (§4.1 error semantics).
    pub fn has_errored(&self, upstream_id: &str) -> bool {
        self.errored_upstreams.lock().contains(upstream_id)
    }

    fn mark_errored(&self, upstream_id: &str) {
        self.errored_upstreams.lock().insert(upstream_id.to_string());
    }

    pub fn send_downstream(&self, result: Arc<QueryResult>) {
        for downstream in self.downstreams.lock().iter() {
            downstream.on_next(&self.id, Arc::clone(&result));
        }
    }

    /// Records `upstream_id` as errored and forwards `err` to every downstream, exactly as
    /// the errored upstream reported it (§4.1, §7: "propagate as-is ... no recovery").
    pub fn forward_error(&self, upstream_id: &str, err: PipelineError) {
        self.mark_errored(upstream_id);
        tracing::warn!(node = %self.id, %upstream_id, kind = ?err.kind, "upstream error observed");
        for downstream in self.downstreams.lock().iter() {
            downstream.on_error(&self.id, err.clone());
        }
    }

    pub fn forward_complete(&self, final_seq: u64, total_seq: u64) {
        for downstream in self.downstreams.lock().iter() {
            downstream.on_complete(&self.id, final_seq, total_seq);
        }
    }

    /// Idempotent close: returns `true` the first time it's called (so a caller can chain
    /// "close resources the first time only"), `false` on every subsequent call.
    pub fn close_once(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// True the first time this node observes its pipeline's cancellation token tripped,
    /// false on every call after. Callers use this to log and forward a terminal
    /// `on_complete` exactly once (§5 "a cancelled node drops any pending upstream deliveries
    /// and forwards a terminal onComplete downstream").
    pub fn mark_cancellation_observed_once(&self) -> bool {
        self.cancellation_observed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
