//! `Result`/`ResultView` (§4.2): one batch of time-series produced by a node for a given
//! sequence id, and the lightweight wrapper transforming nodes build around an upstream
//! result.

use crate::node::Node;
use crate::rollup::RollupConfig;
use crate::series::{IdKind, TimeSeries};
use crate::time::{TimeSpecification, TimeUnit};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// One batch of time-series produced by a node for a given `sequence_id` (§3). Owned by the
/// node that emitted it; a wrapping node retains `upstream` so that closing the wrapper
/// closes the thing it wraps exactly once.
pub struct QueryResult {
    pub sequence_id: u64,
    pub time_spec: Option<TimeSpecification>,
    pub resolution: TimeUnit,
    pub rollup_config: Option<Arc<dyn RollupConfig>>,
    pub id_kind: IdKind,
    pub series: Vec<Arc<dyn TimeSeries>>,
    /// Non-owning back-reference to the node that produced this result (§9 "weak
    /// back-references"); a node outlives every result it emits.
    source: Weak<dyn Node>,
    /// Present only on results built by [`QueryResult::view_of`]; retained so that dropping
    /// or closing the view releases the wrapped upstream result.
    upstream: Option<Arc<QueryResult>>,
    closed: AtomicBool,
}

impl QueryResult {
    /// A leaf result: no upstream to release on close.
    pub fn leaf(
        source: Weak<dyn Node>,
        sequence_id: u64,
        time_spec: Option<TimeSpecification>,
        resolution: TimeUnit,
        rollup_config: Option<Arc<dyn RollupConfig>>,
        id_kind: IdKind,
        series: Vec<Arc<dyn TimeSeries>>,
    ) -> Self {
        QueryResult {
            sequence_id,
            time_spec,
            resolution,
            rollup_config,
            id_kind,
            series,
            source,
            upstream: None,
            closed: AtomicBool::new(false),
        }
    }

    /// The `ResultView` constructor (§4.2): delegates every metadata field to `upstream`
    /// and substitutes only `series` with the caller's freshly projected ones. Reports
    /// `source` as itself for downstream traversal.
    pub fn view_of(
        source: Weak<dyn Node>,
        upstream: Arc<QueryResult>,
        series: Vec<Arc<dyn TimeSeries>>,
    ) -> Self {
        QueryResult {
            sequence_id: upstream.sequence_id,
            time_spec: upstream.time_spec.clone(),
            resolution: upstream.resolution,
            rollup_config: upstream.rollup_config.clone(),
            id_kind: upstream.id_kind,
            series,
            source,
            upstream: Some(upstream),
            closed: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> Option<Arc<dyn Node>> {
        self.source.upgrade()
    }

    /// Releases this result and (if it is a view) the upstream result it wraps, exactly
    /// once. Safe to call any number of times, including implicitly via `Drop`.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            if let Some(upstream) = &self.upstream {
                upstream.close();
            }
        }
    }
}

impl Drop for QueryResult {
    fn drop(&mut self) {
        self.close();
    }
}
