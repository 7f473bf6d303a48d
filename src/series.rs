//! Time-series identity and the `TimeSeries` trait: the lazily-iterating projection every
//! wrapped result exposes in place of its upstream's raw series (§2, §4.2).

use crate::error::PipelineError;
use crate::value::{ArraySeries, ScalarPoint, SummaryPoint, ValueKind};
use std::sync::Arc;

/// Distinguishes the two identity representations a data store can use, at the type level,
/// so nodes can refuse incompatible inputs rather than silently mis-comparing ids.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum IdKind {
    StringId,
    ByteId,
}

/// An opaque time-series identity: a metric name plus tags, or a raw byte encoding.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum TimeSeriesId {
    String(String),
    Bytes(Vec<u8>),
}

impl TimeSeriesId {
    pub fn kind(&self) -> IdKind {
        match self {
            TimeSeriesId::String(_) => IdKind::StringId,
            TimeSeriesId::Bytes(_) => IdKind::ByteId,
        }
    }
}

pub type ScalarStream = Box<dyn Iterator<Item = Result<ScalarPoint, PipelineError>> + Send>;
pub type SummaryStream = Box<dyn Iterator<Item = Result<SummaryPoint, PipelineError>> + Send>;

/// An identified sequence of values that may expose multiple [`ValueKind`]s (§3). A
/// `TimeSeries` is owned by the `Result` that contains it; it exposes a stable set of kinds
/// for its lifetime, and `open_*` for a kind it doesn't expose returns `None` ("absent",
/// §3 invariants).
pub trait TimeSeries: Send + Sync {
    fn id(&self) -> &TimeSeriesId;

    /// The stable set of kinds this series exposes. Node wrapping logic consults this to
    /// implement the IteratorFactory registry's three-way rule (§4.3): absent, transformed,
    /// or passed through.
    fn kinds(&self) -> &[ValueKind];

    fn open_scalar(&self) -> Option<ScalarStream> {
        None
    }

    /// Arrays are dense and materialized eagerly (unlike the scalar/summary streams, which
    /// compute lazily per `next()`), so a transform that needs to fail can only do so here,
    /// at `open_array` time, rather than mid-iteration.
    fn open_array(&self) -> Result<Option<ArraySeries>, PipelineError> {
        Ok(None)
    }

    fn open_summary(&self) -> Option<SummaryStream> {
        None
    }
}

/// A concrete, fully-materialized series, as a leaf data-store node would hand upstream.
/// Also the natural shape for test fixtures.
pub struct MaterializedSeries {
    id: TimeSeriesId,
    kinds: Vec<ValueKind>,
    scalars: Option<Arc<Vec<ScalarPoint>>>,
    array: Option<ArraySeries>,
    summary: Option<Arc<Vec<SummaryPoint>>>,
}

impl MaterializedSeries {
    pub fn scalar(id: TimeSeriesId, points: Vec<ScalarPoint>) -> Self {
        MaterializedSeries {
            id,
            kinds: vec![ValueKind::NumericScalar],
            scalars: Some(Arc::new(points)),
            array: None,
            summary: None,
        }
    }

    pub fn array(id: TimeSeriesId, array: ArraySeries) -> Self {
        MaterializedSeries {
            id,
            kinds: vec![ValueKind::NumericArray],
            scalars: None,
            array: Some(array),
            summary: None,
        }
    }

    pub fn summary(id: TimeSeriesId, points: Vec<SummaryPoint>) -> Self {
        MaterializedSeries {
            id,
            kinds: vec![ValueKind::NumericSummary],
            scalars: None,
            array: None,
            summary: Some(Arc::new(points)),
        }
    }
}

impl TimeSeries for MaterializedSeries {
    fn id(&self) -> &TimeSeriesId {
        &self.id
    }

    fn kinds(&self) -> &[ValueKind] {
        &self.kinds
    }

    fn open_scalar(&self) -> Option<ScalarStream> {
        let points = Arc::clone(self.scalars.as_ref()?);
        Some(Box::new(
            (0..points.len()).map(move |i| Ok(points[i])),
        ))
    }

    fn open_array(&self) -> Result<Option<ArraySeries>, PipelineError> {
        Ok(self.array.clone())
    }

    fn open_summary(&self) -> Option<SummaryStream> {
        let points = Arc::clone(self.summary.as_ref()?);
        Some(Box::new(
            (0..points.len()).map(move |i| Ok(points[i].clone())),
        ))
    }
}
