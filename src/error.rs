//! Engine Error Types
//!
//! Every fallible operation in the crate surfaces one of these kinds. The
//! `Display` strings double as the fixed message catalog: whenever an error
//! is recorded on a model's message slot, the rendered text (plus the
//! offending identifier, where one exists) is what callers read back via
//! `take_msg_text`.

use std::fmt;
use std::io;
use thiserror::Error;

/// Which block the FCL reader was inside when the input ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofSite {
    /// Inside a `VAR_INPUT` / `VAR_OUTPUT` declaration block
    Variables,
    /// Inside a `FUZZIFY` block (or a declared variable has none)
    Sets,
    /// Inside a `RULEBLOCK`
    Rules,
}

impl fmt::Display for EofSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EofSite::Variables => write!(f, "variables"),
            EofSite::Sets => write!(f, "sets"),
            EofSite::Rules => write!(f, "rules"),
        }
    }
}

/// Fuzzy engine errors
#[derive(Error, Debug)]
pub enum FuzzyError {
    /// Variable or set identifier collides within its scope
    #[error("identifier '{0}' is not unique within its scope")]
    NonUniqueId(String),

    /// Attempt to make a variable's domain empty
    #[error("left and right domain endpoints must differ")]
    SameLeftRight,

    /// The FCL reader hit an unexpected token or a mis-shaped membership function
    #[error("invalid FCL file format: {0}")]
    InvalidFileFormat(String),

    /// The FCL stream ended before the expected block closed
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(EofSite),

    /// Attempt to remove the output variable
    #[error("the output variable cannot be deleted")]
    CantDeleteOutput,

    /// Attempt to add a second output variable
    #[error("an output variable already exists")]
    OutputAlreadyExists,

    /// Unknown defuzzification, composition, or inference selector
    #[error("invalid method selector '{0}'")]
    InvalidMethod(String),

    /// Underlying I/O refused to open the path
    #[error("unable to open file '{path}': {source}")]
    FileOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A `RANGE(lo .. hi)` comment could not be parsed
    #[error("unable to parse range value: {0}")]
    RangeValue(String),

    /// A registry handle or index does not resolve to a live object
    #[error("unknown handle: {0}")]
    UnknownHandle(String),

    /// The per-model session cap was reached
    #[error("session limit ({0}) reached")]
    SessionLimit(usize),

    /// The operation requires an output variable and the model has none
    #[error("model has no output variable")]
    NoOutputVariable,
}

/// Result type for fuzzy engine operations
pub type Result<T> = std::result::Result<T, FuzzyError>;
