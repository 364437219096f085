//! Series / Sample - Ingestion output
//!
//! Decoded remote-write data handed to the dispatcher.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Reserved label holding the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Label set identifying one time series.
///
/// Label names are unique. Iteration is sorted by label name, which keeps
/// log output and serialization deterministic.
///
/// # Examples
/// ```
/// use contracts::Series;
///
/// let series = Series::from_pairs([("__name__", "up"), ("job", "node")]);
/// assert_eq!(series.metric_name(), Some("up"));
/// assert_eq!(series.get("job"), Some("node"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    labels: BTreeMap<String, String>,
}

impl Series {
    /// Create a series from an existing label map
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    /// Build a series from `(name, value)` pairs; a repeated name keeps the last value
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of the given label, if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Value of the reserved `__name__` label
    pub fn metric_name(&self) -> Option<&str> {
        self.get(METRIC_NAME_LABEL)
    }

    /// Iterate `(name, value)` pairs in label-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the series carries no labels at all
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Borrow the underlying label map
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
}

/// One observation of a series
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label set, shared by every sample of the same wire time series
    pub series: Arc<Series>,

    /// Observed value
    pub value: f64,

    /// Source timestamp (milliseconds since epoch)
    pub timestamp_ms: i64,
}

impl Sample {
    /// Create a new sample
    pub fn new(series: Arc<Series>, value: f64, timestamp_ms: i64) -> Self {
        Self {
            series,
            value,
            timestamp_ms,
        }
    }

    /// `NaN`, `+Inf` and `-Inf` are never delivered downstream
    #[inline]
    pub fn is_deliverable(&self) -> bool {
        self.value.is_finite()
    }
}
