//! Metric exclusion filter
//!
//! Decides whether a metric should be skipped before any rate query is
//! issued: histogram/summary components (`_count`, `_bucket`, `_sum`),
//! internal metrics by prefix, and metrics already covered by backend-side
//! aggregation rules.

use std::collections::HashSet;

/// Pure exclusion predicate over metric names.
#[derive(Debug, Clone)]
pub struct MetricFilter {
    excluded_suffixes: Vec<String>,
    excluded_prefixes: Vec<String>,
}

impl MetricFilter {
    pub fn new(excluded_suffixes: Vec<String>, excluded_prefixes: Vec<String>) -> Self {
        Self { excluded_suffixes, excluded_prefixes }
    }

    /// Whether `name` should be excluded from rate analysis.
    ///
    /// Rules are evaluated in order; any match excludes:
    /// 1. name ends with an excluded suffix
    /// 2. name starts with an excluded prefix
    /// 3. name is present in `aggregation_rule_names`
    pub fn should_exclude(&self, name: &str, aggregation_rule_names: &HashSet<String>) -> bool {
        if self.excluded_suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())) {
            return true;
        }
        if self.excluded_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            return true;
        }
        aggregation_rule_names.contains(name)
    }

    /// Retain only the names that pass the filter, preserving input order.
    pub fn apply(
        &self,
        names: Vec<String>,
        aggregation_rule_names: &HashSet<String>,
    ) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| !self.should_exclude(name, aggregation_rule_names))
            .collect()
    }
}

impl Default for MetricFilter {
    fn default() -> Self {
        Self::new(
            ratewatch_domain::constants::DEFAULT_EXCLUDED_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ratewatch_domain::constants::DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}
