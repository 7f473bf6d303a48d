//! The numeric value model: the tagged point/array representation flowing through the
//! pipeline, and the promotion rules between integral and floating representations.

use crate::time::{DurationSpec, TimeStamp};
use std::collections::BTreeMap;

/// The closed set of shapes a time-series can expose (§3).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ValueKind {
    NumericScalar,
    NumericArray,
    NumericSummary,
}

impl ValueKind {
    pub const ALL: [ValueKind; 3] = [
        ValueKind::NumericScalar,
        ValueKind::NumericArray,
        ValueKind::NumericSummary,
    ];
}

/// A single numeric value, tagged integral or floating. No implicit coercion happens at
/// this level; callers that need a common representation use [`NumericValue::promote`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NumericValue {
    Integral(i64),
    Floating(f64),
}

impl NumericValue {
    pub fn is_floating(self) -> bool {
        matches!(self, NumericValue::Floating(_))
    }

    pub fn as_f64(self) -> f64 {
        match self {
            NumericValue::Integral(i) => i as f64,
            NumericValue::Floating(f) => f,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, NumericValue::Floating(f) if f.is_nan())
    }

    /// Monotonic, one-way promotion to floating. Once a value (or the accumulator holding
    /// it) has been promoted, it never reverts to integral.
    pub fn promote(self) -> NumericValue {
        NumericValue::Floating(self.as_f64())
    }

    pub fn nan() -> NumericValue {
        NumericValue::Floating(f64::NAN)
    }
}

/// A `(timestamp, value)` pair belonging to a `NumericScalar` series.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarPoint {
    pub timestamp: TimeStamp,
    pub value: NumericValue,
}

impl ScalarPoint {
    pub fn new(timestamp: TimeStamp, value: NumericValue) -> Self {
        ScalarPoint { timestamp, value }
    }
}

/// The backing storage for a `NumericArray`, tagged all-integral or all-floating at the
/// series level. Promotion is monotonic and permanent: once any element is floating, the
/// whole series is represented as floating.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayValues {
    Integral(Vec<i64>),
    Floating(Vec<f64>),
}

impl ArrayValues {
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::Integral(v) => v.len(),
            ArrayValues::Floating(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<NumericValue> {
        match self {
            ArrayValues::Integral(v) => v.get(index).map(|i| NumericValue::Integral(*i)),
            ArrayValues::Floating(v) => v.get(index).map(|f| NumericValue::Floating(*f)),
        }
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ArrayValues::Floating(_))
    }

    /// Promotes an integral array to floating in place. A no-op if already floating.
    pub fn promote_to_floating(&mut self) {
        if let ArrayValues::Integral(v) = self {
            *self = ArrayValues::Floating(v.iter().map(|i| *i as f64).collect());
        }
    }
}

/// A dense time-aligned array of values (§3). `start` and `interval` (taken from the
/// enclosing result's [`crate::time::TimeSpecification`]) together with the array's length
/// fully determine every element's timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySeries {
    pub start: TimeStamp,
    pub interval: DurationSpec,
    pub values: ArrayValues,
}

impl ArraySeries {
    pub fn timestamp_at(&self, index: usize) -> TimeStamp {
        let mut ts = self.start;
        for _ in 0..index {
            ts = ts + self.interval;
        }
        ts
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A `NumericSummary` point: one timestamp, many statistics. The `summary-id` keys are
/// small non-negative integers whose meaning is defined by the emitting result's
/// [`crate::rollup::RollupConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryPoint {
    pub timestamp: TimeStamp,
    pub values: BTreeMap<i32, NumericValue>,
}

impl SummaryPoint {
    pub fn new(timestamp: TimeStamp) -> Self {
        SummaryPoint {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, summary_id: i32, value: NumericValue) {
        self.values.insert(summary_id, value);
    }

    pub fn get(&self, summary_id: i32) -> Option<NumericValue> {
        self.values.get(&summary_id).copied()
    }
}
