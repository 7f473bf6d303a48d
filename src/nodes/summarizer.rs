//! The summarizer node (§4.5): reduces an entire series to at most one `NumericSummary`
//! point, with numeric promotion and two NaN policies shared with the sliding-window node.

use super::{promote_or_nan, SumState};
use crate::context::{CancellationToken, PipelineContext};
use crate::error::PipelineError;
use crate::node::{Node, NodeBase, NodeKind};
use crate::registry::NodeFactory;
use crate::result::QueryResult;
use crate::rollup::SummaryName;
use crate::series::{ArraySeries, ScalarStream, SummaryStream, TimeSeries, TimeSeriesId};
use crate::time::TimeStamp;
use crate::value::{NumericValue, ScalarPoint, SummaryPoint, ValueKind};
use serde::{Deserialize, Deserializer};
use std::sync::{Arc, Weak};

const CONSUMED_KINDS: [ValueKind; 2] = [ValueKind::NumericScalar, ValueKind::NumericArray];
const PRODUCED_KINDS: [ValueKind; 1] = [ValueKind::NumericSummary];

fn deserialize_summary_names<'de, D>(deserializer: D) -> Result<Vec<SummaryName>, D::Error>
where
    D: Deserializer<'de>,
{
    let names: Vec<String> = Vec::deserialize(deserializer)?;
    names
        .into_iter()
        .map(|name| {
            SummaryName::parse(&name)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown summary name: {name}")))
        })
        .collect()
}

#[derive(Clone, Debug, Deserialize)]
pub struct SummarizerConfig {
    #[serde(deserialize_with = "deserialize_summary_names")]
    pub summaries: Vec<SummaryName>,
    #[serde(rename = "infectiousNan", default)]
    pub infectious_nan: bool,
}

pub struct SummarizerNode {
    base: NodeBase,
    config: Arc<SummarizerConfig>,
    context: Arc<PipelineContext>,
    self_ref: Weak<SummarizerNode>,
}

impl SummarizerNode {
    pub fn new(context: Arc<PipelineContext>, id: String, config: SummarizerConfig) -> Arc<Self> {
        tracing::info!(node = %id, kind = "summarizer", "node constructed");
        Arc::new_cyclic(|self_ref| SummarizerNode {
            base: NodeBase::new(id),
            config: Arc::new(config),
            context,
            self_ref: self_ref.clone(),
        })
    }

    fn weak_dyn(&self) -> Weak<dyn Node> {
        self.self_ref.clone()
    }

    /// Resolves every configured summary name to the `summary-id` the result's RollupConfig
    /// assigns it (§4.5); a name the config doesn't define is a `ConfigError`, same as an
    /// absent RollupConfig altogether.
    fn resolve_summary_ids(&self, result: &QueryResult) -> Result<Vec<(SummaryName, i32)>, PipelineError> {
        let rollup = result.rollup_config.as_ref().ok_or_else(|| {
            PipelineError::config(self.base.id(), "result carries no RollupConfig")
        })?;
        self.config
            .summaries
            .iter()
            .map(|name| {
                rollup.summary_id(*name).map(|id| (*name, id)).ok_or_else(|| {
                    PipelineError::config(
                        self.base.id(),
                        format!("RollupConfig does not define summary `{}`", name.as_str()),
                    )
                })
            })
            .collect()
    }
}

impl Node for SummarizerNode {
    fn id(&self) -> &str {
        self.base.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Summarizer
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
        let resolved = match self.resolve_summary_ids(&result) {
            Ok(resolved) => Arc::new(resolved),
            Err(err) => {
                self.base.forward_error(upstream_id, err);
                return;
            }
        };
        let wrapped: Vec<Arc<dyn TimeSeries>> = result
            .series
            .iter()
            .map(|source| {
                Arc::new(SummarizerSeries {
                    source: Arc::clone(source),
                    resolved: Arc::clone(&resolved),
                    infectious_nan: self.config.infectious_nan,
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

struct SummarizerSeries {
    source: Arc<dyn TimeSeries>,
    resolved: Arc<Vec<(SummaryName, i32)>>,
    infectious_nan: bool,
    cancellation: CancellationToken,
}

impl TimeSeries for SummarizerSeries {
    fn id(&self) -> &TimeSeriesId {
        self.source.id()
    }

    fn kinds(&self) -> &[ValueKind] {
        &PRODUCED_KINDS
    }

    fn open_summary(&self) -> Option<SummaryStream> {
        let source_kinds = self.source.kinds();
        if source_kinds.contains(&ValueKind::NumericScalar) {
            let inner = self.source.open_scalar()?;
            Some(Box::new(SummarizerScalarIter {
                inner,
                resolved: Arc::clone(&self.resolved),
                infectious_nan: self.infectious_nan,
                cancellation: self.cancellation.clone(),
                done: false,
            }))
        } else if source_kinds.contains(&ValueKind::NumericArray) {
            match self.source.open_array() {
                Ok(Some(array)) => Some(summarize_array(
                    &array,
                    &self.resolved,
                    self.infectious_nan,
                )),
                Ok(None) => None,
                Err(err) => Some(Box::new(std::iter::once(Err(err)))),
            }
        } else {
            // Neither kind this node consumes is present; whatever NumericSummary the source
            // already exposes (if any) passes through unchanged (§4.3 rule 3).
            self.source.open_summary()
        }
    }
}

/// Per-series reduction state (§4.5): a running accumulator promoting integral -> floating
/// the first time a floating input arrives, shared by the two NaN policies.
struct SummaryAccumulator {
    sum: SumState,
    count_all: i64,
    count_nonnan: i64,
    min: Option<NumericValue>,
    max: Option<NumericValue>,
    first: Option<NumericValue>,
    last: Option<NumericValue>,
    promoted: bool,
    nan_seen: bool,
}

impl SummaryAccumulator {
    fn new() -> Self {
        SummaryAccumulator {
            sum: SumState::zero(),
            count_all: 0,
            count_nonnan: 0,
            min: None,
            max: None,
            first: None,
            last: None,
            promoted: false,
            nan_seen: false,
        }
    }

    fn admit(&mut self, value: NumericValue) {
        self.count_all += 1;
        if value.is_floating() {
            self.promoted = true;
        }
        if value.is_nan() {
            self.nan_seen = true;
            return;
        }
        self.count_nonnan += 1;
        self.sum = self.sum.add(value);
        self.min = Some(match self.min {
            Some(m) if m.as_f64() <= value.as_f64() => m,
            _ => value,
        });
        self.max = Some(match self.max {
            Some(m) if m.as_f64() >= value.as_f64() => m,
            _ => value,
        });
        if self.first.is_none() {
            self.first = Some(value);
        }
        self.last = Some(value);
    }

    fn finalize(
        &self,
        timestamp: TimeStamp,
        resolved: &[(SummaryName, i32)],
        infectious_nan: bool,
    ) -> SummaryPoint {
        let contaminated = infectious_nan && self.nan_seen;
        let mut point = SummaryPoint::new(timestamp);
        for (name, id) in resolved {
            let value = match name {
                SummaryName::Count => NumericValue::Integral(if infectious_nan {
                    self.count_all
                } else {
                    self.count_nonnan
                }),
                SummaryName::Sum => {
                    if contaminated {
                        NumericValue::nan()
                    } else {
                        self.sum.to_numeric_value(self.promoted)
                    }
                }
                SummaryName::Avg => {
                    if contaminated || self.count_nonnan == 0 {
                        NumericValue::nan()
                    } else {
                        NumericValue::Floating(self.sum.as_f64() / self.count_nonnan as f64)
                    }
                }
                SummaryName::Min => {
                    if contaminated {
                        NumericValue::nan()
                    } else {
                        promote_or_nan(self.min, self.promoted)
                    }
                }
                SummaryName::Max => {
                    if contaminated {
                        NumericValue::nan()
                    } else {
                        promote_or_nan(self.max, self.promoted)
                    }
                }
                SummaryName::First => {
                    if contaminated {
                        NumericValue::nan()
                    } else {
                        promote_or_nan(self.first, self.promoted)
                    }
                }
                SummaryName::Last => {
                    if contaminated {
                        NumericValue::nan()
                    } else {
                        promote_or_nan(self.last, self.promoted)
                    }
                }
            };
            point.insert(*id, value);
        }
        point
    }
}

struct SummarizerScalarIter {
    inner: ScalarStream,
    resolved: Arc<Vec<(SummaryName, i32)>>,
    infectious_nan: bool,
    cancellation: CancellationToken,
    done: bool,
}

impl Iterator for SummarizerScalarIter {
    type Item = Result<SummaryPoint, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.done = true;
        let mut accumulator = SummaryAccumulator::new();
        let mut first_timestamp = None;
        loop {
            if self.cancellation.is_cancelled() {
                return None;
            }
            match self.inner.next() {
                None => break,
                Some(Err(err)) => return Some(Err(err)),
                Some(Ok(point)) => {
                    if first_timestamp.is_none() {
                        first_timestamp = Some(point.timestamp);
                    }
                    accumulator.admit(point.value);
                }
            }
        }
        let timestamp = first_timestamp?;
        Some(Ok(accumulator.finalize(timestamp, &self.resolved, self.infectious_nan)))
    }
}

fn summarize_array(
    array: &ArraySeries,
    resolved: &[(SummaryName, i32)],
    infectious_nan: bool,
) -> SummaryStream {
    if array.is_empty() {
        return Box::new(std::iter::empty());
    }
    let mut accumulator = SummaryAccumulator::new();
    for index in 0..array.len() {
        if let Some(value) = array.values.get(index) {
            accumulator.admit(value);
        }
    }
    let timestamp = array.timestamp_at(0);
    let point = accumulator.finalize(timestamp, resolved, infectious_nan);
    Box::new(std::iter::once(Ok(point)))
}

pub struct SummarizerFactory;

impl NodeFactory for SummarizerFactory {
    fn kind(&self) -> NodeKind {
        NodeKind::Summarizer
    }

    fn value_kinds(&self) -> &'static [ValueKind] {
        &CONSUMED_KINDS
    }

    fn create(
        &self,
        context: Arc<PipelineContext>,
        id: String,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn Node>, PipelineError> {
        let parsed: SummarizerConfig = serde_json::from_value(config.clone())
            .map_err(|e| PipelineError::config(&id, e.to_string()))?;
        Ok(SummarizerNode::new(context, id, parsed) as Arc<dyn Node>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollup::{RollupConfig, StaticRollupConfig};

    fn epsilon_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    fn point(ts_secs: i64, value: f64) -> Result<ScalarPoint, PipelineError> {
        Ok(ScalarPoint::new(
            TimeStamp::from_epoch_seconds(ts_secs),
            NumericValue::Floating(value),
        ))
    }

    fn int_point(ts_secs: i64, value: i64) -> Result<ScalarPoint, PipelineError> {
        Ok(ScalarPoint::new(
            TimeStamp::from_epoch_seconds(ts_secs),
            NumericValue::Integral(value),
        ))
    }

    fn resolved_for(config: &StaticRollupConfig, names: &[SummaryName]) -> Vec<(SummaryName, i32)> {
        names
            .iter()
            .map(|n| (*n, config.summary_id(*n).unwrap()))
            .collect()
    }

    #[test]
    fn scenario_s1_integers() {
        let rollup = StaticRollupConfig::sample();
        let names = [
            SummaryName::Sum,
            SummaryName::Count,
            SummaryName::Max,
            SummaryName::Min,
            SummaryName::Avg,
        ];
        let resolved = resolved_for(&rollup, &names);
        let source: ScalarStream = Box::new(
            [int_point(0, 42), int_point(60, 24), int_point(120, -8), int_point(240, 1)].into_iter(),
        );
        let mut iter = SummarizerScalarIter {
            inner: source,
            resolved: Arc::new(resolved),
            infectious_nan: false,
            cancellation: CancellationToken::new(),
            done: false,
        };
        let output = iter.next().unwrap().unwrap();
        assert!(iter.next().is_none());
        assert_eq!(output.get(0), Some(NumericValue::Integral(59)));
        assert_eq!(output.get(1), Some(NumericValue::Integral(4)));
        assert_eq!(output.get(2), Some(NumericValue::Integral(42)));
        assert_eq!(output.get(3), Some(NumericValue::Integral(-8)));
        assert!(epsilon_eq(output.get(5).unwrap().as_f64(), 14.75));
    }

    #[test]
    fn scenario_s3_mixed_promotes_to_floating() {
        let rollup = StaticRollupConfig::sample();
        let names = [SummaryName::Sum, SummaryName::Max, SummaryName::Min];
        let resolved = resolved_for(&rollup, &names);
        let source: ScalarStream = Box::new(
            [int_point(0, 42), int_point(60, 24), point(120, -8.3), point(240, 1.2)].into_iter(),
        );
        let mut iter = SummarizerScalarIter {
            inner: source,
            resolved: Arc::new(resolved),
            infectious_nan: false,
            cancellation: CancellationToken::new(),
            done: false,
        };
        let output = iter.next().unwrap().unwrap();
        let sum = output.get(0).unwrap();
        assert!(sum.is_floating());
        assert!(epsilon_eq(sum.as_f64(), 58.9));
        let max = output.get(2).unwrap();
        assert!(max.is_floating());
        assert!(epsilon_eq(max.as_f64(), 42.0));
    }

    #[test]
    fn scenario_s5_infectious_nan() {
        let rollup = StaticRollupConfig::sample();
        let names = [
            SummaryName::Sum,
            SummaryName::Count,
            SummaryName::Max,
            SummaryName::Min,
            SummaryName::Avg,
        ];
        let resolved = resolved_for(&rollup, &names);
        let source: ScalarStream = Box::new(
            [
                point(0, 42.5),
                point(60, f64::NAN),
                point(120, f64::NAN),
                point(240, 1.2),
            ]
            .into_iter(),
        );
        let mut iter = SummarizerScalarIter {
            inner: source,
            resolved: Arc::new(resolved),
            infectious_nan: true,
            cancellation: CancellationToken::new(),
            done: false,
        };
        let output = iter.next().unwrap().unwrap();
        assert!(output.get(0).unwrap().is_nan());
        assert_eq!(output.get(1), Some(NumericValue::Integral(4)));
        assert!(output.get(2).unwrap().is_nan());
        assert!(output.get(3).unwrap().is_nan());
        assert!(output.get(5).unwrap().is_nan());
    }

    #[test]
    fn empty_series_emits_nothing() {
        let resolved = vec![(SummaryName::Sum, 0)];
        let source: ScalarStream = Box::new(std::iter::empty());
        let mut iter = SummarizerScalarIter {
            inner: source,
            resolved: Arc::new(resolved),
            infectious_nan: false,
            cancellation: CancellationToken::new(),
            done: false,
        };
        assert!(iter.next().is_none());
    }

    #[test]
    fn unknown_summary_name_is_rejected_at_deserialize_time() {
        let json = serde_json::json!({ "summaries": ["sum", "median"] });
        let result: Result<SummarizerConfig, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }
}
