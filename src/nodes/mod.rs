//! Concrete node kinds (§4.4, §4.5): the sliding-window aggregator and the whole-series
//! summarizer, plus the small numeric-accumulator helpers they share.

pub mod sliding_window;
pub mod summarizer;

use crate::value::NumericValue;

/// A running sum that starts integral and promotes to floating the first time a floating
/// value is folded in; mirrors [`NumericValue::promote`]'s one-way rule at the accumulator
/// level rather than the single-value level.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum SumState {
    Int(i64),
    Float(f64),
}

impl SumState {
    pub(crate) fn zero() -> Self {
        SumState::Int(0)
    }

    pub(crate) fn as_f64(self) -> f64 {
        match self {
            SumState::Int(i) => i as f64,
            SumState::Float(f) => f,
        }
    }

    pub(crate) fn add(self, value: NumericValue) -> SumState {
        match (self, value) {
            (SumState::Int(acc), NumericValue::Integral(i)) => SumState::Int(acc + i),
            (SumState::Int(acc), NumericValue::Floating(f)) => SumState::Float(acc as f64 + f),
            (SumState::Float(acc), v) => SumState::Float(acc + v.as_f64()),
        }
    }

    pub(crate) fn subtract(self, value: NumericValue) -> SumState {
        match self {
            SumState::Int(acc) => SumState::Int(acc - value.as_f64() as i64),
            SumState::Float(acc) => SumState::Float(acc - value.as_f64()),
        }
    }

    /// Renders the accumulated sum, forcing floating representation if `promoted` (the
    /// wider aggregate - not just this sum - has seen a floating input; §4.4/§4.5 promote
    /// sum/min/max/first/last uniformly, not independently per statistic).
    pub(crate) fn to_numeric_value(self, promoted: bool) -> NumericValue {
        match (self, promoted) {
            (SumState::Float(f), _) => NumericValue::Floating(f),
            (SumState::Int(i), false) => NumericValue::Integral(i),
            (SumState::Int(i), true) => NumericValue::Floating(i as f64),
        }
    }
}

/// Renders an optional extremal/positional statistic (min/max/first/last), promoting to
/// floating if the aggregate has been promoted and reporting NaN if no contributing value
/// was ever seen (an all-NaN window or series under the skip policy).
pub(crate) fn promote_or_nan(value: Option<NumericValue>, promoted: bool) -> NumericValue {
    match value {
        None => NumericValue::nan(),
        Some(v) if promoted => v.promote(),
        Some(v) => v,
    }
}
