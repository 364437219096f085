//! Rule file parser
//!
//! One rule per line: `<label> <op> <value...>`, single-space separated.
//! Blank lines and lines starting with `#` are ignored. The value is
//! everything after the second space and may itself contain spaces.

use crate::error::{FilterError, Result};
use crate::rule::{FilterOp, FilterRule};

/// Parse a complete rule source, preserving rule order
pub fn parse(content: &str) -> Result<Vec<FilterRule>> {
    let mut rules = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if let Some(rule) = parse_line(idx + 1, line)? {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// Parse one line; `Ok(None)` for blank and comment lines
fn parse_line(line_no: usize, line: &str) -> Result<Option<FilterRule>> {
    let line = line.trim_start();
    if line.trim_end().is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.splitn(3, ' ');
    let (Some(label), Some(code), Some(value)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(malformed(line_no, line));
    };
    if label.is_empty() || code.is_empty() {
        return Err(malformed(line_no, line));
    }

    let (op, case_insensitive) =
        FilterOp::from_code(code).ok_or_else(|| FilterError::UnknownOperator {
            line: line_no,
            op: code.to_string(),
        })?;

    Ok(Some(FilterRule::new(label, op, case_insensitive, value)))
}

fn malformed(line: usize, content: &str) -> FilterError {
    FilterError::MalformedRule {
        line,
        content: content.to_string(),
    }
}
