//! Result selection
//!
//! Applies threshold, label-pattern, sorting and top-N truncation to the
//! aggregated results before presentation. Deterministic: DPM ties break by
//! metric name ascending, so repeated runs over the same input produce
//! identical output.

use std::cmp::Ordering;

use ratewatch_domain::{MetricRateResult, RateWatchError, Result, SortKey};

/// Parsed label filter: `key=value` exact match or `key=~regex`.
#[derive(Debug, Clone)]
pub enum LabelPattern {
    Exact { key: String, value: String },
    Regex { key: String, pattern: regex::Regex },
}

impl LabelPattern {
    /// Parse a pattern expression.
    ///
    /// # Errors
    /// Returns `RateWatchError::InvalidInput` when the expression has no
    /// `=`/`=~` separator, an empty key, or an invalid regex.
    pub fn parse(expr: &str) -> Result<Self> {
        if let Some((key, pattern)) = expr.split_once("=~") {
            if key.is_empty() {
                return Err(RateWatchError::InvalidInput(format!(
                    "label pattern '{expr}' has an empty key"
                )));
            }
            let pattern = regex::Regex::new(pattern).map_err(|e| {
                RateWatchError::InvalidInput(format!("invalid label regex '{pattern}': {e}"))
            })?;
            return Ok(Self::Regex { key: key.to_string(), pattern });
        }
        if let Some((key, value)) = expr.split_once('=') {
            if key.is_empty() {
                return Err(RateWatchError::InvalidInput(format!(
                    "label pattern '{expr}' has an empty key"
                )));
            }
            return Ok(Self::Exact { key: key.to_string(), value: value.to_string() });
        }
        Err(RateWatchError::InvalidInput(format!(
            "label pattern '{expr}' must be key=value or key=~regex"
        )))
    }

    fn matches(&self, result: &MetricRateResult) -> bool {
        let Some(labels) = &result.labels else {
            // Results without enriched labels pass through unchanged: label
            // filtering requires label enrichment upstream (see Selection
            // docs), so an absent label set is not treated as a mismatch.
            return true;
        };
        match self {
            Self::Exact { key, value } => labels.get(key).is_some_and(|v| v == value),
            Self::Regex { key, pattern } => labels.get(key).is_some_and(|v| pattern.is_match(v)),
        }
    }
}

/// Threshold / pattern / sort / truncate pipeline.
///
/// Label filtering only takes effect on results whose `labels` field was
/// populated by upstream enrichment; without enrichment the label stage is a
/// documented no-op pass-through.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    min_dpm: f64,
    label_pattern: Option<LabelPattern>,
    sort_by: SortKey,
    top_n: Option<usize>,
}

impl Selection {
    pub fn new(min_dpm: f64) -> Self {
        Self { min_dpm, label_pattern: None, sort_by: SortKey::default(), top_n: None }
    }

    pub fn label_pattern(mut self, pattern: Option<LabelPattern>) -> Self {
        self.label_pattern = pattern;
        self
    }

    pub fn sort_by(mut self, sort_by: SortKey) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn top_n(mut self, top_n: Option<usize>) -> Self {
        self.top_n = top_n;
        self
    }

    /// Apply the pipeline: strict threshold, label pattern, sort, truncate.
    pub fn apply(&self, results: Vec<MetricRateResult>) -> Vec<MetricRateResult> {
        let mut selected: Vec<MetricRateResult> = results
            .into_iter()
            // Strict threshold: a DPM exactly equal to min_dpm is excluded.
            .filter(|r| r.dpm > self.min_dpm)
            .filter(|r| self.label_pattern.as_ref().map_or(true, |p| p.matches(r)))
            .collect();

        selected.sort_by(|a, b| match self.sort_by {
            SortKey::Dpm => b
                .dpm
                .partial_cmp(&a.dpm)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name)),
            SortKey::Name => a.name.cmp(&b.name),
        });

        if let Some(n) = self.top_n {
            selected.truncate(n);
        }
        selected
    }
}
