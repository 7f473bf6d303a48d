//! The sliding-window aggregation node (§4.4): a rolling aggregate over the half-open
//! interval `(t - window, t]`, computed lazily per point pulled.

use super::{promote_or_nan, SumState};
use crate::context::{CancellationToken, PipelineContext};
use crate::error::PipelineError;
use crate::node::{Node, NodeBase, NodeKind};
use crate::registry::NodeFactory;
use crate::result::QueryResult;
use crate::series::{ArraySeries, ScalarStream, SummaryStream, TimeSeries, TimeSeriesId};
use crate::time::{DurationSpec, TimeStamp, TimeUnit};
use crate::value::{ArrayValues, NumericValue, ScalarPoint, ValueKind};
use serde::{Deserialize, Deserializer};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

const DEFAULT_RECOMPUTE_BOUND: u32 = 1024;
const TRANSFORMED_KINDS: [ValueKind; 2] = [ValueKind::NumericScalar, ValueKind::NumericArray];

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    First,
    Last,
}

fn deserialize_window<'de, D>(deserializer: D) -> Result<DurationSpec, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_duration_string(&text).map_err(serde::de::Error::custom)
}

/// Parses a duration string like `"5m"` or `"1h"` (§6) into a `(amount, unit)` pair. The
/// suffix table mirrors [`TimeUnit`]; `ms` is checked before the single-letter units so it
/// isn't swallowed by the `m` (minutes) case.
fn parse_duration_string(text: &str) -> Result<DurationSpec, String> {
    let text = text.trim();
    let (amount_str, unit) = if let Some(rest) = text.strip_suffix("ms") {
        (rest, TimeUnit::Millis)
    } else if let Some(rest) = text.strip_suffix('s') {
        (rest, TimeUnit::Seconds)
    } else if let Some(rest) = text.strip_suffix('m') {
        (rest, TimeUnit::Minutes)
    } else if let Some(rest) = text.strip_suffix('h') {
        (rest, TimeUnit::Hours)
    } else if let Some(rest) = text.strip_suffix('d') {
        (rest, TimeUnit::Days)
    } else {
        return Err(format!("unrecognized duration string: `{text}`"));
    };
    let amount: i64 = amount_str
        .parse()
        .map_err(|_| format!("invalid duration amount in `{text}`"))?;
    Ok(DurationSpec::new(amount, unit))
}

#[derive(Clone, Debug, Deserialize)]
pub struct SlidingWindowConfig {
    #[serde(rename = "window", deserialize_with = "deserialize_window")]
    pub window: DurationSpec,
    pub aggregator: Aggregator,
    #[serde(rename = "infectiousNan", default)]
    pub infectious_nan: bool,
}

pub struct SlidingWindowNode {
    base: NodeBase,
    config: Arc<SlidingWindowConfig>,
    context: Arc<PipelineContext>,
    self_ref: Weak<SlidingWindowNode>,
}

impl SlidingWindowNode {
    pub fn new(
        context: Arc<PipelineContext>,
        id: String,
        config: SlidingWindowConfig,
    ) -> Arc<Self> {
        tracing::info!(node = %id, kind = "sliding-window", "node constructed");
        Arc::new_cyclic(|self_ref| SlidingWindowNode {
            base: NodeBase::new(id),
            config: Arc::new(config),
            context,
            self_ref: self_ref.clone(),
        })
    }

    fn weak_dyn(&self) -> Weak<dyn Node> {
        self.self_ref.clone()
    }
}

impl Node for SlidingWindowNode {
    fn id(&self) -> &str {
        self.base.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::SlidingWindow
    }

    fn on_next(&self, upstream_id: &str, result: Arc<QueryResult>) {
        if self.base.has_errored(upstream_id) {
            return;
        }
        if self.context.cancellation.is_cancelled() {
            if self.base.mark_cancellation_observed_once() {
                tracing::debug!(node = %self.base.id(), "cancellation observed");
                self.base.forward_complete(0, 0);
            }
            return;
        }
        let query_start = result.time_spec.as_ref().map(|spec| spec.start);
        let wrapped: Vec<Arc<dyn TimeSeries>> = result
            .series
            .iter()
            .map(|source| {
                Arc::new(SlidingWindowSeries {
                    source: Arc::clone(source),
                    config: Arc::clone(&self.config),
                    query_start,
                    node_id: self.base.id().to_string(),
                    cancellation: self.context.cancellation.clone(),
                }) as Arc<dyn TimeSeries>
            })
            .collect();
        let view = Arc::new(QueryResult::view_of(self.weak_dyn(), result, wrapped));
        self.base.send_downstream(view);
    }

    fn on_complete(&self, _upstream_id: &str, final_seq: u64, total_seq: u64) {
        self.base.forward_complete(final_seq, total_seq);
    }

    fn on_error(&self, upstream_id: &str, err: PipelineError) {
        self.base.forward_error(upstream_id, err);
    }

    fn close(&self) {
        self.base.close_once();
    }

    fn add_downstream(&self, downstream: Arc<dyn Node>) {
        self.base.add_downstream(downstream);
    }
}

struct SlidingWindowSeries {
    source: Arc<dyn TimeSeries>,
    config: Arc<SlidingWindowConfig>,
    query_start: Option<TimeStamp>,
    node_id: String,
    cancellation: CancellationToken,
}

impl TimeSeries for SlidingWindowSeries {
    fn id(&self) -> &TimeSeriesId {
        self.source.id()
    }

    fn kinds(&self) -> &[ValueKind] {
        self.source.kinds()
    }

    fn open_scalar(&self) -> Option<ScalarStream> {
        if !self.source.kinds().contains(&ValueKind::NumericScalar) {
            return None;
        }
        let inner = self.source.open_scalar()?;
        Some(Box::new(SlidingWindowScalarIter {
            inner,
            engine: WindowEngine::new(&self.config),
            query_start: self.query_start,
            cancellation: self.cancellation.clone(),
            exhausted: false,
        }))
    }

    fn open_array(&self) -> Result<Option<ArraySeries>, PipelineError> {
        if !self.source.kinds().contains(&ValueKind::NumericArray) {
            return Ok(None);
        }
        let Some(array) = self.source.open_array()? else {
            return Ok(None);
        };
        if array.interval.amount <= 0 {
            return Err(PipelineError::type_error(
                &self.node_id,
                "array series interval must be a positive duration",
            ));
        }
        Ok(Some(window_array(
            &array,
            &self.config,
            self.query_start,
            &self.cancellation,
        )))
    }

    fn open_summary(&self) -> Option<SummaryStream> {
        self.source.open_summary()
    }
}

struct WindowEngine {
    window: DurationSpec,
    aggregator: Aggregator,
    infectious_nan: bool,
    recompute_bound: u32,
    buffer: VecDeque<ScalarPoint>,
    min_deque: VecDeque<ScalarPoint>,
    max_deque: VecDeque<ScalarPoint>,
    sum_state: SumState,
    nonnan_count: i64,
    nan_count_in_window: i64,
    /// Sticky, series-level promotion flag (mirrors `SummaryAccumulator.promoted`): set once a
    /// floating input is admitted and never cleared, even once that point slides out of the
    /// window. Unlike `nan_count_in_window`, this is not an "in window" count.
    promoted: bool,
    evictions_since_recompute: u32,
}

impl WindowEngine {
    fn new(config: &SlidingWindowConfig) -> Self {
        WindowEngine {
            window: config.window,
            aggregator: config.aggregator,
            infectious_nan: config.infectious_nan,
            recompute_bound: DEFAULT_RECOMPUTE_BOUND,
            buffer: VecDeque::new(),
            min_deque: VecDeque::new(),
            max_deque: VecDeque::new(),
            sum_state: SumState::zero(),
            nonnan_count: 0,
            nan_count_in_window: 0,
            promoted: false,
            evictions_since_recompute: 0,
        }
    }

    fn admit(&mut self, point: ScalarPoint) {
        self.buffer.push_back(point);
        self.accumulate(point);
    }

    fn accumulate(&mut self, point: ScalarPoint) {
        if point.value.is_floating() {
            self.promoted = true;
        }
        if point.value.is_nan() {
            self.nan_count_in_window += 1;
            return;
        }
        self.nonnan_count += 1;
        self.sum_state = self.sum_state.add(point.value);
        while matches!(self.min_deque.back(), Some(p) if p.value.as_f64() >= point.value.as_f64())
        {
            self.min_deque.pop_back();
        }
        self.min_deque.push_back(point);
        while matches!(self.max_deque.back(), Some(p) if p.value.as_f64() <= point.value.as_f64())
        {
            self.max_deque.pop_back();
        }
        self.max_deque.push_back(point);
    }

    fn evict(&mut self, left_edge: TimeStamp) {
        let mut evicted_nonnan = 0u32;
        while let Some(front) = self.buffer.front().copied() {
            if front.timestamp > left_edge {
                break;
            }
            self.buffer.pop_front();
            if front.value.is_nan() {
                self.nan_count_in_window -= 1;
            } else {
                self.nonnan_count -= 1;
                self.sum_state = self.sum_state.subtract(front.value);
                evicted_nonnan += 1;
            }
        }
        while matches!(self.min_deque.front(), Some(p) if p.timestamp <= left_edge) {
            self.min_deque.pop_front();
        }
        while matches!(self.max_deque.front(), Some(p) if p.timestamp <= left_edge) {
            self.max_deque.pop_front();
        }
        self.evictions_since_recompute += evicted_nonnan;
        if self.evictions_since_recompute > self.recompute_bound {
            self.full_recompute();
        }
    }

    /// Rebuilds every accumulator from the retained buffer, guarding against floating-point
    /// drift after many incremental add/subtract cycles (§4.4).
    fn full_recompute(&mut self) {
        let points: Vec<ScalarPoint> = self.buffer.iter().copied().collect();
        self.min_deque.clear();
        self.max_deque.clear();
        self.sum_state = SumState::zero();
        self.nonnan_count = 0;
        self.nan_count_in_window = 0;
        for point in points {
            self.accumulate(point);
        }
        self.evictions_since_recompute = 0;
    }

    fn aggregate(&self) -> NumericValue {
        let contaminated = self.infectious_nan && self.nan_count_in_window > 0;
        let promoted = self.promoted;
        match self.aggregator {
            Aggregator::Count => NumericValue::Integral(self.nonnan_count),
            Aggregator::Sum => {
                if contaminated {
                    NumericValue::nan()
                } else {
                    self.sum_state.to_numeric_value(promoted)
                }
            }
            Aggregator::Avg => {
                if contaminated || self.nonnan_count == 0 {
                    NumericValue::nan()
                } else {
                    NumericValue::Floating(self.sum_state.as_f64() / self.nonnan_count as f64)
                }
            }
            Aggregator::Min => {
                if contaminated {
                    NumericValue::nan()
                } else {
                    promote_or_nan(self.min_deque.front().map(|p| p.value), promoted)
                }
            }
            Aggregator::Max => {
                if contaminated {
                    NumericValue::nan()
                } else {
                    promote_or_nan(self.max_deque.front().map(|p| p.value), promoted)
                }
            }
            Aggregator::First => {
                if contaminated {
                    NumericValue::nan()
                } else {
                    let first = self.buffer.iter().find(|p| !p.value.is_nan()).map(|p| p.value);
                    promote_or_nan(first, promoted)
                }
            }
            Aggregator::Last => {
                if contaminated {
                    NumericValue::nan()
                } else {
                    let last = self
                        .buffer
                        .iter()
                        .rev()
                        .find(|p| !p.value.is_nan())
                        .map(|p| p.value);
                    promote_or_nan(last, promoted)
                }
            }
        }
    }
}

struct SlidingWindowScalarIter {
    inner: ScalarStream,
    engine: WindowEngine,
    query_start: Option<TimeStamp>,
    cancellation: CancellationToken,
    exhausted: bool,
}

impl Iterator for SlidingWindowScalarIter {
    type Item = Result<ScalarPoint, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.exhausted {
                return None;
            }
            if self.cancellation.is_cancelled() {
                self.exhausted = true;
                return None;
            }
            let point = match self.inner.next() {
                None => {
                    self.exhausted = true;
                    return None;
                }
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(p)) => p,
            };
            self.engine.admit(point);
            let left_edge = point.timestamp.saturating_sub_duration(self.engine.window);
            self.engine.evict(left_edge);
            if let Some(start) = self.query_start {
                if point.timestamp < start {
                    continue;
                }
            }
            let value = self.engine.aggregate();
            return Some(Ok(ScalarPoint::new(point.timestamp, value)));
        }
    }
}

fn window_array(
    array: &ArraySeries,
    config: &SlidingWindowConfig,
    query_start: Option<TimeStamp>,
    cancellation: &CancellationToken,
) -> ArraySeries {
    let mut engine = WindowEngine::new(config);
    let mut out_values: Vec<NumericValue> = Vec::new();
    let mut out_start: Option<TimeStamp> = None;
    for index in 0..array.len() {
        if cancellation.is_cancelled() {
            break;
        }
        let timestamp = array.timestamp_at(index);
        let Some(value) = array.values.get(index) else {
            break;
        };
        let point = ScalarPoint::new(timestamp, value);
        engine.admit(point);
        let left_edge = timestamp.saturating_sub_duration(engine.window);
        engine.evict(left_edge);
        if let Some(start) = query_start {
            if timestamp < start {
                continue;
            }
        }
        if out_start.is_none() {
            out_start = Some(timestamp);
        }
        out_values.push(engine.aggregate());
    }
    let start = out_start.unwrap_or_else(|| array.timestamp_at(0));
    let is_floating = out_values.iter().any(|v| v.is_floating());
    let values = if is_floating {
        ArrayValues::Floating(out_values.iter().map(|v| v.as_f64()).collect())
    } else {
        ArrayValues::Integral(
            out_values
                .iter()
                .map(|v| match v {
                    NumericValue::Integral(i) => *i,
                    NumericValue::Floating(f) => *f as i64,
                })
                .collect(),
        )
    };
    ArraySeries {
        start,
        interval: array.interval,
        values,
    }
}

pub struct SlidingWindowFactory;

impl NodeFactory for SlidingWindowFactory {
    fn kind(&self) -> NodeKind {
        NodeKind::SlidingWindow
    }

    fn value_kinds(&self) -> &'static [ValueKind] {
        &TRANSFORMED_KINDS
    }

    fn create(
        &self,
        context: Arc<PipelineContext>,
        id: String,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn Node>, PipelineError> {
        let parsed: SlidingWindowConfig = serde_json::from_value(config.clone())
            .map_err(|e| PipelineError::config(&id, e.to_string()))?;
        if parsed.window.amount <= 0 {
            return Err(PipelineError::config(
                &id,
                "window must be a positive duration",
            ));
        }
        Ok(SlidingWindowNode::new(context, id, parsed) as Arc<dyn Node>)
    }
}
