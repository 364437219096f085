//! # Filter
//!
//! Allow-list rule engine deciding which series are forwarded.
//!
//! Responsibilities:
//! - Parse the line-oriented rule file (`<label> <op> <value...>`)
//! - Evaluate a series against the loaded rules (logical OR, first match wins)
//!
//! An empty rule set keeps everything; a series without labels is never kept
//! once at least one rule is loaded.
//!
//! # Example
//!
//! ```
//! use contracts::Series;
//! use filter::RuleSet;
//!
//! let rules = RuleSet::parse("# keep test apps\napp SI test\n").unwrap();
//! assert!(rules.matches(&Series::from_pairs([("__name__", "x"), ("app", "testApp")])));
//! assert!(!rules.matches(&Series::from_pairs([("app", "prodApp")])));
//! ```

mod error;
mod parser;
mod rule;
mod rule_set;

pub use error::{FilterError, Result};
pub use rule::{FilterOp, FilterRule};
pub use rule_set::RuleSet;
