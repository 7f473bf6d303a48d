//! Shared test scaffolding: a sink node that records whatever a constructed graph hands it,
//! standing in for the orchestration layer that would otherwise serialize results.

use parking_lot::Mutex;
use rollup_pipeline::error::PipelineError;
use rollup_pipeline::node::{Node, NodeKind};
use rollup_pipeline::result::QueryResult;
use std::sync::Arc;

pub struct SinkNode {
    id: String,
    pub received: Mutex<Vec<Arc<QueryResult>>>,
    pub errors: Mutex<Vec<PipelineError>>,
    pub completions: Mutex<Vec<(u64, u64)>>,
}

impl SinkNode {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(SinkNode {
            id: id.into(),
            received: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        })
    }
}

impl Node for SinkNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Summarizer
    }

    fn on_next(&self, _upstream_id: &str, result: Arc<QueryResult>) {
        self.received.lock().push(result);
    }

    fn on_complete(&self, _upstream_id: &str, final_seq: u64, total_seq: u64) {
        self.completions.lock().push((final_seq, total_seq));
    }

    fn on_error(&self, _upstream_id: &str, err: PipelineError) {
        self.errors.lock().push(err);
    }

    fn close(&self) {}

    fn add_downstream(&self, _downstream: Arc<dyn Node>) {}
}
