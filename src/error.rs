//! The closed error taxonomy (§7). Every failure the core itself can raise is one of these
//! four kinds; there is no open-ended/dynamic error type here, since callers downstream
//! (serialization, the orchestration layer) are expected to match on `kind` rather than
//! format-sniff a message.

use derive_more::{Display, Error};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PipelineErrorKind {
    /// Invalid or missing node config; raised at construction.
    Config,
    /// A wrapped error received from an upstream node; re-emitted unchanged.
    Upstream,
    /// A series exposed a kind whose element representation violated an invariant.
    Type,
    /// The operation was aborted by the pipeline's cancellation token.
    Cancelled,
}

/// A failed result carries this: an error kind plus a human-readable message naming the
/// node that raised it (§7). Cloneable so the same error can be handed to several
/// downstreams without re-deriving it.
#[derive(Clone, Debug, Display, Error)]
#[display("{kind:?} error in node `{node_id}`: {message}")]
pub struct PipelineError {
    pub kind: PipelineErrorKind,
    pub node_id: String,
    pub message: String,
}

impl PipelineError {
    pub fn config(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError {
            kind: PipelineErrorKind::Config,
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    pub fn upstream(node_id: impl Into<String>, source: &PipelineError) -> Self {
        PipelineError {
            kind: PipelineErrorKind::Upstream,
            node_id: node_id.into(),
            message: format!("upstream failure: {source}"),
        }
    }

    pub fn type_error(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError {
            kind: PipelineErrorKind::Type,
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(node_id: impl Into<String>) -> Self {
        PipelineError {
            kind: PipelineErrorKind::Cancelled,
            node_id: node_id.into(),
            message: "operation was cancelled".to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
