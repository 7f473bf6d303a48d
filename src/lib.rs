//! # rollup-pipeline
//!
//! A streaming time-series query pipeline. Callers assemble a directed acyclic graph of
//! [`Node`](node::Node)s: leaf nodes read raw series from a data store (an external
//! collaborator, see [`external`]), interior nodes transform [`QueryResult`](result::QueryResult)s
//! in flight. The two transforms this crate ships are a rolling [sliding-window
//! aggregate][nodes::sliding_window] and a whole-series [summarizer][nodes::summarizer].
//!
//! ## Execution model
//!
//! Scheduling is single-threaded and cooperative within one pipeline: an upstream node calls
//! a downstream node's [`Node::on_next`](node::Node::on_next) synchronously, on the caller's
//! thread. A node does not suspend; if it needs to buffer, it does so internally. Multiple
//! pipelines may run in parallel on different threads, but there is no concurrency between
//! nodes within a single pipeline (see [`PipelineContext`](context::PipelineContext)).
//!
//! Point-level computation happens lazily: a wrapping node builds a [`QueryResult::view_of`]
//! around the upstream result and substitutes each series with a projection that computes
//! its next point only when a downstream consumer actually pulls one.
//!
//! ## Numeric model
//!
//! Points are tagged integral or floating ([`value::NumericValue`]); promotion from integral
//! to floating is one-way and permanent, both at the single-value level and at the
//! accumulator level used by the two transform nodes.
//!
//! ## What this crate does not do
//!
//! Query/descriptor parsing, the concrete time-series storage backend, and output
//! serialization are external collaborators named by trait in [`external`] and
//! [`rollup`]/[`context`]; this crate only consumes them.

pub mod context;
pub mod error;
pub mod external;
pub mod node;
pub mod nodes;
pub mod registry;
pub mod result;
pub mod rollup;
pub mod series;
pub mod time;
pub mod value;

pub use context::PipelineContext;
pub use error::{PipelineError, PipelineErrorKind, PipelineResult};
pub use node::{Node, NodeKind};
pub use registry::{Registry, global_registry};
pub use result::QueryResult;
