//! End-to-end: a leaf result carrying a `RollupConfig` pushed through a constructed
//! `SummarizerNode`, asserting on the `NumericSummary` point the sink receives.

mod common;

use common::SinkNode;
use rollup_pipeline::context::PipelineContext;
use rollup_pipeline::node::Node;
use rollup_pipeline::nodes::summarizer::{SummarizerConfig, SummarizerNode};
use rollup_pipeline::registry::Registry;
use rollup_pipeline::result::QueryResult;
use rollup_pipeline::rollup::{RollupConfig, StaticRollupConfig, SummaryName};
use rollup_pipeline::series::{IdKind, MaterializedSeries, TimeSeries, TimeSeriesId};
use rollup_pipeline::time::{TimeStamp, TimeUnit};
use rollup_pipeline::value::{NumericValue, ScalarPoint, SummaryPoint};
use std::sync::{Arc, Weak};

fn leaf_with_rollup(points: Vec<ScalarPoint>, rollup: Arc<dyn RollupConfig>) -> Arc<QueryResult> {
    let series = Arc::new(MaterializedSeries::scalar(
        TimeSeriesId::String("metric.latency".into()),
        points,
    ));
    Arc::new(QueryResult::leaf(
        Weak::new(),
        7,
        None,
        TimeUnit::Seconds,
        Some(rollup),
        IdKind::StringId,
        vec![series],
    ))
}

#[test]
fn summarizer_through_the_graph_matches_scenario_s1() {
    let context = Arc::new(PipelineContext::new(Arc::new(Registry::new())));
    let node = SummarizerNode::new(
        Arc::clone(&context),
        "summarizer-1".into(),
        SummarizerConfig {
            summaries: vec![
                SummaryName::Sum,
                SummaryName::Count,
                SummaryName::Max,
                SummaryName::Min,
                SummaryName::Avg,
            ],
            infectious_nan: false,
        },
    );
    let sink = SinkNode::new("sink-1");
    node.add_downstream(Arc::clone(&sink) as Arc<dyn Node>);

    let rollup: Arc<dyn RollupConfig> = Arc::new(StaticRollupConfig::sample());
    let points = vec![
        ScalarPoint::new(TimeStamp::from_epoch_seconds(0), NumericValue::Integral(42)),
        ScalarPoint::new(TimeStamp::from_epoch_seconds(60), NumericValue::Integral(24)),
        ScalarPoint::new(TimeStamp::from_epoch_seconds(120), NumericValue::Integral(-8)),
        ScalarPoint::new(TimeStamp::from_epoch_seconds(240), NumericValue::Integral(1)),
    ];
    node.on_next("source-1", leaf_with_rollup(points, rollup.clone()));

    let received = sink.received.lock();
    assert_eq!(received.len(), 1);
    let view = &received[0];
    assert_eq!(view.sequence_id, 7);
    let series = &view.series[0];
    let mut summaries = series.open_summary().unwrap();
    let point = summaries.next().unwrap().unwrap();
    assert!(summaries.next().is_none());

    assert_eq!(point.get(rollup.summary_id(SummaryName::Sum).unwrap()), Some(NumericValue::Integral(59)));
    assert_eq!(point.get(rollup.summary_id(SummaryName::Count).unwrap()), Some(NumericValue::Integral(4)));
    assert_eq!(point.get(rollup.summary_id(SummaryName::Max).unwrap()), Some(NumericValue::Integral(42)));
    assert_eq!(point.get(rollup.summary_id(SummaryName::Min).unwrap()), Some(NumericValue::Integral(-8)));
    let avg = point.get(rollup.summary_id(SummaryName::Avg).unwrap()).unwrap();
    assert!((avg.as_f64() - 14.75).abs() < 1e-3);
}

#[test]
fn missing_rollup_config_surfaces_as_config_error_not_a_panic() {
    let context = Arc::new(PipelineContext::new(Arc::new(Registry::new())));
    let node = SummarizerNode::new(
        Arc::clone(&context),
        "summarizer-2".into(),
        SummarizerConfig {
            summaries: vec![SummaryName::Sum],
            infectious_nan: false,
        },
    );
    let sink = SinkNode::new("sink-2");
    node.add_downstream(Arc::clone(&sink) as Arc<dyn Node>);

    let series = Arc::new(MaterializedSeries::scalar(
        TimeSeriesId::String("metric.no_rollup".into()),
        vec![ScalarPoint::new(
            TimeStamp::from_epoch_seconds(0),
            NumericValue::Integral(1),
        )],
    ));
    let leaf = Arc::new(QueryResult::leaf(
        Weak::new(),
        1,
        None,
        TimeUnit::Seconds,
        None,
        IdKind::StringId,
        vec![series],
    ));
    node.on_next("source-1", leaf);

    assert!(sink.received.lock().is_empty());
    let errors = sink.errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, rollup_pipeline::PipelineErrorKind::Config);
}

/// A source already exposing `NumericSummary` (e.g. a store-side rollup pushed down) has
/// neither kind this node consumes, so its summary points pass through unchanged (§4.3 rule 3).
#[test]
fn a_series_already_summarized_passes_through_unchanged() {
    let context = Arc::new(PipelineContext::new(Arc::new(Registry::new())));
    let node = SummarizerNode::new(
        Arc::clone(&context),
        "summarizer-3".into(),
        SummarizerConfig {
            summaries: vec![SummaryName::Sum],
            infectious_nan: false,
        },
    );
    let sink = SinkNode::new("sink-3");
    node.add_downstream(Arc::clone(&sink) as Arc<dyn Node>);

    let mut upstream_point = SummaryPoint::new(TimeStamp::from_epoch_seconds(0));
    upstream_point.insert(0, NumericValue::Integral(100));
    let series = Arc::new(MaterializedSeries::summary(
        TimeSeriesId::String("metric.pre_summarized".into()),
        vec![upstream_point],
    ));
    let rollup: Arc<dyn RollupConfig> = Arc::new(StaticRollupConfig::sample());
    let leaf = Arc::new(QueryResult::leaf(
        Weak::new(),
        2,
        None,
        TimeUnit::Seconds,
        Some(rollup),
        IdKind::StringId,
        vec![series],
    ));
    node.on_next("source-1", leaf);

    let received = sink.received.lock();
    let mut summaries = received[0].series[0].open_summary().unwrap();
    let point = summaries.next().unwrap().unwrap();
    assert_eq!(point.get(0), Some(NumericValue::Integral(100)));
}
