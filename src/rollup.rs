//! `RollupConfig`: the mapping between human summary names and the compact numeric ids
//! carried inside `NumericSummary` points. Consumed as an external collaborator (§6); this
//! module only defines the trait and a small in-memory implementation used by tests and by
//! callers that don't have a richer config source of their own.

use std::collections::HashMap;

/// One of the summaries a [`crate::nodes::summarizer::SummarizerNode`] can compute.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum SummaryName {
    Sum,
    Avg,
    Max,
    Min,
    Count,
    First,
    Last,
}

impl SummaryName {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryName::Sum => "sum",
            SummaryName::Avg => "avg",
            SummaryName::Max => "max",
            SummaryName::Min => "min",
            SummaryName::Count => "count",
            SummaryName::First => "first",
            SummaryName::Last => "last",
        }
    }

    pub fn parse(name: &str) -> Option<SummaryName> {
        Some(match name {
            "sum" => SummaryName::Sum,
            "avg" => SummaryName::Avg,
            "max" => SummaryName::Max,
            "min" => SummaryName::Min,
            "count" => SummaryName::Count,
            "first" => SummaryName::First,
            "last" => SummaryName::Last,
            _ => return None,
        })
    }
}

/// Resolves between summary names and the compact ids a `RollupConfig`-aware `Result`
/// carries. Immutable for the lifetime of the `Result` that references it (§5).
pub trait RollupConfig: Send + Sync {
    fn summary_id(&self, name: SummaryName) -> Option<i32>;
    fn summary_name(&self, id: i32) -> Option<SummaryName>;
}

/// A fixed name -> id table, e.g. the sample config used throughout §8:
/// `{sum: 0, count: 1, max: 2, min: 3, avg: 5}` (id `4` deliberately unassigned).
#[derive(Clone, Debug, Default)]
pub struct StaticRollupConfig {
    by_name: HashMap<SummaryName, i32>,
    by_id: HashMap<i32, SummaryName>,
}

impl StaticRollupConfig {
    pub fn new(entries: impl IntoIterator<Item = (SummaryName, i32)>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        for (name, id) in entries {
            by_name.insert(name, id);
            by_id.insert(id, name);
        }
        StaticRollupConfig { by_name, by_id }
    }

    /// The sample config used in the scenario walkthroughs (§8): sum=0, count=1, max=2,
    /// min=3, avg=5. Id 4 is intentionally absent.
    pub fn sample() -> Self {
        StaticRollupConfig::new([
            (SummaryName::Sum, 0),
            (SummaryName::Count, 1),
            (SummaryName::Max, 2),
            (SummaryName::Min, 3),
            (SummaryName::Avg, 5),
        ])
    }
}

impl RollupConfig for StaticRollupConfig {
    fn summary_id(&self, name: SummaryName) -> Option<i32> {
        self.by_name.get(&name).copied()
    }

    fn summary_name(&self, id: i32) -> Option<SummaryName> {
        self.by_id.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_matches_scenarios() {
        let config = StaticRollupConfig::sample();
        assert_eq!(config.summary_id(SummaryName::Sum), Some(0));
        assert_eq!(config.summary_id(SummaryName::Avg), Some(5));
        assert_eq!(config.summary_name(4), None);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(SummaryName::parse("median"), None);
        assert_eq!(SummaryName::parse("sum"), Some(SummaryName::Sum));
    }
}
