//! Timestamps, duration units, and the optional per-result time grid.

use hifitime::{Duration as HifiDuration, TimeUnits};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// The units a duration (a window size, a result's resolution, a query span) can be
/// expressed in. Mirrors the set the upstream time-string parser (out of scope, §6) is
/// expected to produce.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn to_hifitime(self, amount: i64) -> HifiDuration {
        match self {
            TimeUnit::Millis => amount.milliseconds(),
            TimeUnit::Seconds => amount.seconds(),
            TimeUnit::Minutes => amount.minutes(),
            TimeUnit::Hours => amount.hours(),
            TimeUnit::Days => amount.days(),
        }
    }
}

/// A duration expressed as `(amount, unit)`, the wire representation windowSize and
/// resolution take before being turned into a [`hifitime::Duration`] for arithmetic.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct DurationSpec {
    pub amount: i64,
    pub unit: TimeUnit,
}

impl DurationSpec {
    pub const fn new(amount: i64, unit: TimeUnit) -> Self {
        DurationSpec { amount, unit }
    }

    pub fn as_hifitime(&self) -> HifiDuration {
        self.unit.to_hifitime(self.amount)
    }
}

/// An instant in time, stored at millisecond resolution. Ordered; supports addition of a
/// [`DurationSpec`]. Two results can disagree on display precision (millis vs seconds) but
/// always compare correctly since the internal representation is always millis.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct TimeStamp(i64);

impl TimeStamp {
    pub const EPOCH: TimeStamp = TimeStamp(0);

    pub const fn from_epoch_millis(millis: i64) -> Self {
        TimeStamp(millis)
    }

    pub const fn from_epoch_seconds(seconds: i64) -> Self {
        TimeStamp(seconds * 1000)
    }

    pub const fn epoch_millis(self) -> i64 {
        self.0
    }

    /// Truncating (not rounding) conversion to whole seconds, used for NumericSummary output
    /// timestamps (§4.5: "epoch seconds").
    pub const fn epoch_seconds(self) -> i64 {
        self.0.div_euclid(1000)
    }

    pub fn checked_add(self, duration: DurationSpec) -> Option<TimeStamp> {
        let nanos = duration.as_hifitime().total_nanoseconds();
        let millis = nanos.checked_div(1_000_000)?;
        let millis: i64 = millis.try_into().ok()?;
        self.0.checked_add(millis).map(TimeStamp)
    }

    /// `self - duration`, saturating at `TimeStamp::EPOCH`'s underlying i64 range instead of
    /// panicking; used to compute a sliding window's left edge.
    pub fn saturating_sub_duration(self, duration: DurationSpec) -> TimeStamp {
        let nanos = duration.as_hifitime().total_nanoseconds();
        let millis = (nanos / 1_000_000) as i64;
        TimeStamp(self.0.saturating_sub(millis))
    }
}

impl fmt::Debug for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeStamp({}ms)", self.0)
    }
}

impl Add<DurationSpec> for TimeStamp {
    type Output = TimeStamp;
    fn add(self, rhs: DurationSpec) -> TimeStamp {
        self.checked_add(rhs)
            .expect("timestamp arithmetic overflowed i64 milliseconds")
    }
}

impl Sub for TimeStamp {
    type Output = HifiDuration;
    fn sub(self, rhs: TimeStamp) -> HifiDuration {
        (self.0 - rhs.0).milliseconds()
    }
}

/// The optional per-result time grid (§3). When present, every series in the result is
/// implicitly aligned to it: a `NumericArray`'s timestamps are `start + i * interval`.
#[derive(Clone, PartialEq, Debug)]
pub struct TimeSpecification {
    pub start: TimeStamp,
    pub end: TimeStamp,
    pub interval: DurationSpec,
    pub time_zone: String,
}

impl TimeSpecification {
    pub fn timestamp_at(&self, index: usize) -> TimeStamp {
        let mut ts = self.start;
        for _ in 0..index {
            ts = ts + self.interval;
        }
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_duration_units() {
        let ts = TimeStamp::from_epoch_seconds(0);
        assert_eq!(
            ts + DurationSpec::new(5, TimeUnit::Minutes),
            TimeStamp::from_epoch_seconds(300)
        );
        assert_eq!(
            ts + DurationSpec::new(1, TimeUnit::Hours),
            TimeStamp::from_epoch_seconds(3600)
        );
        assert_eq!(
            ts + DurationSpec::new(1, TimeUnit::Days),
            TimeStamp::from_epoch_seconds(86400)
        );
    }

    #[test]
    fn sub_duration_saturates_instead_of_panicking() {
        let ts = TimeStamp::from_epoch_millis(10);
        let earlier = ts.saturating_sub_duration(DurationSpec::new(1, TimeUnit::Days));
        assert!(earlier < ts);
    }

    #[test]
    fn ordering_is_millis_based() {
        let a = TimeStamp::from_epoch_seconds(1);
        let b = TimeStamp::from_epoch_millis(1001);
        assert!(a < b);
    }
}
