//! RuleSet - loaded once at startup, read-only afterwards

use std::path::Path;

use contracts::Series;
use tracing::{debug, info, instrument};

use crate::error::{FilterError, Result};
use crate::parser;
use crate::rule::FilterRule;

/// Ordered, immutable set of allow rules
///
/// Shared behind an `Arc` by every concurrent dispatch; evaluation is pure.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<FilterRule>,
}

impl RuleSet {
    /// Rule set that keeps every series
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap already built rules
    pub fn from_rules(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// Parse a rule source
    ///
    /// # Errors
    /// Malformed lines or unknown operators
    pub fn parse(content: &str) -> Result<Self> {
        parser::parse(content).map(Self::from_rules)
    }

    /// Load rules from a file; no path or an empty path yields the empty set
    ///
    /// # Errors
    /// - File read failure
    /// - Parse failure
    #[instrument(name = "rule_set_load")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            info!("No filter file configured, forwarding every series");
            return Ok(Self::empty());
        };

        let content = std::fs::read_to_string(path).map_err(|source| FilterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::parse(&content)?;

        info!(file = %path.display(), count = rules.len(), "Metric filter loaded");
        for rule in rules.iter() {
            debug!(%rule, "Filter rule");
        }
        Ok(rules)
    }

    /// Decide whether a series is kept
    ///
    /// - no rules: always kept
    /// - no labels: never kept
    /// - otherwise kept if any rule matches
    pub fn matches(&self, series: &Series) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        if series.is_empty() {
            return false;
        }
        self.rules.iter().any(|rule| rule.matches(series))
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if no rule is loaded (fail-open)
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in load order
    pub fn iter(&self) -> impl Iterator<Item = &FilterRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilterOp;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn app(value: &str) -> Series {
        Series::from_pairs([("__name__", "x"), ("app", value)])
    }

    #[test]
    fn test_empty_rule_set_keeps_everything() {
        let rules = RuleSet::empty();
        assert!(rules.matches(&app("anything")));
        assert!(rules.matches(&Series::default()));
    }

    #[test]
    fn test_series_without_labels_is_dropped() {
        let rules = RuleSet::parse("app SI test").unwrap();
        assert!(!rules.matches(&Series::default()));
    }

    #[test]
    fn test_prefix_scenario() {
        let rules = RuleSet::parse("app SI test\n").unwrap();
        assert!(rules.matches(&app("testApp")));
        assert!(!rules.matches(&Series::from_pairs([("app", "prodApp")])));
    }

    #[test]
    fn test_any_rule_keeps_series() {
        let rules = RuleSet::parse("job EC node\napp CC App\nenv EI PROD\n").unwrap();
        assert!(rules.matches(&app("testApp")));
        assert!(rules.matches(&Series::from_pairs([("env", "prod")])));
        assert!(rules.matches(&Series::from_pairs([("job", "node")])));
        assert!(!rules.matches(&Series::from_pairs([("job", "Node")])));
    }

    #[test]
    fn test_equals_insensitive_any_case() {
        let rules = RuleSet::from_rules(vec![FilterRule::new(
            "env",
            FilterOp::Equals,
            true,
            "Staging",
        )]);
        for value in ["staging", "STAGING", "sTaGiNg"] {
            assert!(rules.matches(&Series::from_pairs([("env", value)])), "{value}");
        }
    }

    #[test]
    fn test_matches_is_idempotent() {
        let rules = RuleSet::parse("app SI test").unwrap();
        let series = app("testApp");
        let first = rules.matches(&series);
        assert_eq!(first, rules.matches(&series));
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_load_without_path_is_fail_open() {
        assert!(RuleSet::load(None).unwrap().is_empty());
        assert!(RuleSet::load(Some(Path::new(""))).unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# keep test apps").unwrap();
        writeln!(file, "app SI test").unwrap();
        writeln!(file, "instance cc Instance").unwrap();

        let rules = RuleSet::load(Some(file.path())).unwrap();
        assert_eq!(rules.len(), 2);
        let codes: Vec<_> = rules.iter().map(|r| r.to_string()).collect();
        assert_eq!(codes, vec!["app SI test", "instance CC Instance"]);
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuleSet::load(Some(&dir.path().join("absent.conf"))).unwrap_err();
        assert!(matches!(err, FilterError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_file_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "app SI test").unwrap();
        writeln!(file, "broken").unwrap();

        let err = RuleSet::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, FilterError::MalformedRule { line: 2, .. }));
    }
}
