//! Filter error types

use std::path::PathBuf;
use thiserror::Error;

/// Rule loading errors; all of them are fatal at startup
#[derive(Debug, Error)]
pub enum FilterError {
    /// Rule file could not be read
    #[error("failed to read filter rules from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Line does not split into label, operator and value
    #[error("malformed filter rule at line {line}: '{content}'")]
    MalformedRule { line: usize, content: String },

    /// Operator code outside SI/SC/EI/EC/CI/CC
    #[error("unknown filter operator '{op}' at line {line}")]
    UnknownOperator { line: usize, op: String },
}

/// Filter Result type alias
pub type Result<T> = std::result::Result<T, FilterError>;
