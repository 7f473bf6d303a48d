//! The node-factory registry (§4.3, §6, §9): an explicit, reflection-free mapping from node
//! kind to the factory that constructs it. Per-`ValueKind` iterator dispatch (the other half
//! of §4.3's "IteratorFactory registry") is realized per node, not here: each node kind
//! already knows which kinds it transforms (its `value_kinds()`), and a `TimeSeries`
//! already reports which kinds it exposes, so looking up "does this node transform this
//! series's kind" is a slice membership check at the call site rather than a second runtime
//! table, see [`crate::nodes`] for where that check happens.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::node::{Node, NodeKind};
use crate::value::ValueKind;
use dashmap::DashMap;
use serde_json::Value as ConfigValue;
use std::sync::Arc;

/// `NodeFactory` per node kind (§6): `create`, and the set of `ValueKind`s the resulting
/// nodes transform (as opposed to pass through).
pub trait NodeFactory: Send + Sync {
    fn kind(&self) -> NodeKind;
    fn value_kinds(&self) -> &'static [ValueKind];
    fn create(
        &self,
        context: Arc<PipelineContext>,
        id: String,
        config: &ConfigValue,
    ) -> Result<Arc<dyn Node>, PipelineError>;
}

/// The process-wide registry of node factories. Read-only after construction; safe to
/// share across pipelines running on different threads (§5 "shared resources").
pub struct Registry {
    factories: DashMap<NodeKindKey, Arc<dyn NodeFactory>>,
}

/// `NodeKind` doesn't implement `Hash`/`Eq` by itself being used as a dashmap key directly
/// would work fine since it derives both; this alias just documents the registry's key type.
type NodeKindKey = NodeKind;

impl Registry {
    pub fn new() -> Self {
        Registry {
            factories: DashMap::new(),
        }
    }

    pub fn register(&self, factory: Arc<dyn NodeFactory>) {
        self.factories.insert(factory.kind(), factory);
    }

    pub fn factory(&self, kind: NodeKind) -> Option<Arc<dyn NodeFactory>> {
        self.factories.get(&kind).map(|entry| Arc::clone(entry.value()))
    }

    pub fn create(
        &self,
        kind: NodeKind,
        context: Arc<PipelineContext>,
        id: String,
        config: &ConfigValue,
    ) -> Result<Arc<dyn Node>, PipelineError> {
        let factory = self
            .factory(kind)
            .ok_or_else(|| PipelineError::config(&id, format!("no factory registered for {kind:?}")))?;
        factory.create(context, id, config)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the registry this crate ships: sliding-window and summarizer factories. Most
/// applications will want [`global_registry`] instead, unless they need several independent
/// registries (e.g. in tests).
pub fn builtin_registry() -> Registry {
    let registry = Registry::new();
    registry.register(Arc::new(crate::nodes::sliding_window::SlidingWindowFactory));
    registry.register(Arc::new(crate::nodes::summarizer::SummarizerFactory));
    registry
}

/// The process-wide registry singleton (§5, §9): built once via a one-shot initialization
/// primitive rather than double-checked locking, then shared read-only by every pipeline.
pub fn global_registry() -> Arc<Registry> {
    static CELL: once_cell::sync::OnceCell<Arc<Registry>> = once_cell::sync::OnceCell::new();
    Arc::clone(CELL.get_or_init(|| Arc::new(builtin_registry())))
}
