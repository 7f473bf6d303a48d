//! End-to-end: a leaf result pushed through a constructed `SlidingWindowNode` into a sink,
//! asserting on what the sink actually receives rather than on the node's internals.

mod common;

use common::SinkNode;
use rollup_pipeline::context::PipelineContext;
use rollup_pipeline::node::Node;
use rollup_pipeline::nodes::sliding_window::{Aggregator, SlidingWindowConfig, SlidingWindowNode};
use rollup_pipeline::registry::Registry;
use rollup_pipeline::result::QueryResult;
use rollup_pipeline::series::{IdKind, MaterializedSeries, TimeSeries, TimeSeriesId};
use rollup_pipeline::time::{DurationSpec, TimeStamp, TimeUnit};
use rollup_pipeline::value::{NumericValue, ScalarPoint};
use std::sync::{Arc, Weak};

fn leaf(points: Vec<ScalarPoint>) -> Arc<QueryResult> {
    let series = Arc::new(MaterializedSeries::scalar(
        TimeSeriesId::String("metric.requests".into()),
        points,
    ));
    Arc::new(QueryResult::leaf(
        Weak::new(),
        0,
        None,
        TimeUnit::Seconds,
        None,
        IdKind::StringId,
        vec![series],
    ))
}

#[test]
fn sliding_sum_through_the_graph_matches_scenario_s6() {
    let context = Arc::new(PipelineContext::new(Arc::new(Registry::new())));
    let window = SlidingWindowNode::new(
        Arc::clone(&context),
        "window-1".into(),
        SlidingWindowConfig {
            window: DurationSpec::new(5, TimeUnit::Seconds),
            aggregator: Aggregator::Sum,
            infectious_nan: false,
        },
    );
    let sink = SinkNode::new("sink-1");
    window.add_downstream(Arc::clone(&sink) as Arc<dyn Node>);

    let points: Vec<ScalarPoint> = (1..=6)
        .map(|t| ScalarPoint::new(TimeStamp::from_epoch_seconds(t), NumericValue::Integral(1)))
        .collect();
    window.on_next("source-1", leaf(points));

    let received = sink.received.lock();
    assert_eq!(received.len(), 1);
    let view = &received[0];
    let series = &view.series[0];
    let outputs: Vec<i64> = series
        .open_scalar()
        .unwrap()
        .map(|p| p.unwrap().value.as_f64() as i64)
        .collect();
    assert_eq!(outputs, vec![1, 2, 3, 4, 5, 5]);
}
