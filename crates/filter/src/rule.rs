//! Single filter rule and its matching semantics

use std::fmt;

use contracts::Series;

/// String comparison applied to a label value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Value has the rule value as prefix
    StartsWith,
    /// Value equals the rule value
    Equals,
    /// Value contains the rule value
    Contains,
}

impl FilterOp {
    /// Parse a two-letter operator code (`SI`, `SC`, `EI`, `EC`, `CI`, `CC`), any case.
    ///
    /// Returns the operator and whether the comparison ignores case.
    pub fn from_code(code: &str) -> Option<(Self, bool)> {
        match code.to_ascii_uppercase().as_str() {
            "SI" => Some((Self::StartsWith, true)),
            "SC" => Some((Self::StartsWith, false)),
            "EI" => Some((Self::Equals, true)),
            "EC" => Some((Self::Equals, false)),
            "CI" => Some((Self::Contains, true)),
            "CC" => Some((Self::Contains, false)),
            _ => None,
        }
    }

    /// Canonical operator code
    pub fn code(self, case_insensitive: bool) -> &'static str {
        match (self, case_insensitive) {
            (Self::StartsWith, true) => "SI",
            (Self::StartsWith, false) => "SC",
            (Self::Equals, true) => "EI",
            (Self::Equals, false) => "EC",
            (Self::Contains, true) => "CI",
            (Self::Contains, false) => "CC",
        }
    }

    #[inline]
    fn apply(self, candidate: &str, expected: &str) -> bool {
        match self {
            Self::StartsWith => candidate.starts_with(expected),
            Self::Equals => candidate == expected,
            Self::Contains => candidate.contains(expected),
        }
    }
}

/// `<label> <op> <value>` allow rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    label: String,
    op: FilterOp,
    case_insensitive: bool,
    value: String,
    // Comparison keys, lower-cased for the insensitive variants.
    label_key: String,
    value_key: String,
}

impl FilterRule {
    /// Create a rule
    pub fn new(
        label: impl Into<String>,
        op: FilterOp,
        case_insensitive: bool,
        value: impl Into<String>,
    ) -> Self {
        let label = label.into();
        let value = value.into();
        let (label_key, value_key) = if case_insensitive {
            (label.to_lowercase(), value.to_lowercase())
        } else {
            (label.clone(), value.clone())
        };

        Self {
            label,
            op,
            case_insensitive,
            value,
            label_key,
            value_key,
        }
    }

    /// Label name the rule inspects
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Comparison operator
    pub fn op(&self) -> FilterOp {
        self.op
    }

    /// Whether both operands are lower-cased before comparing
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Comparison value as written in the rule source
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True if the series carries the rule's label and its value satisfies the operator.
    ///
    /// A missing label never matches.
    pub fn matches(&self, series: &Series) -> bool {
        if !self.case_insensitive {
            return series
                .get(&self.label_key)
                .is_some_and(|v| self.op.apply(v, &self.value_key));
        }

        series
            .iter()
            .filter(|(name, _)| eq_lowercase(name, &self.label_key))
            .any(|(_, v)| self.op.apply(&v.to_lowercase(), &self.value_key))
    }
}

/// `candidate.to_lowercase() == lowered` without allocating
fn eq_lowercase(candidate: &str, lowered: &str) -> bool {
    candidate.chars().flat_map(char::to_lowercase).eq(lowered.chars())
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.label,
            self.op.code(self.case_insensitive),
            self.value
        )
    }
}
