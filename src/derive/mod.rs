//! Pattern derivation: expected state in, match targets out.
//!
//! Everything here is pure. Regex patterns are built from escaped values so
//! an address like `10.0.0.5` only matches itself, and every pattern is
//! meant to be searched line by line (see [`crate::matcher`]).

pub mod lvm;
pub mod network;
pub mod partition;
pub mod size;

use std::fmt;

/// One requirement on a command's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// At least one line must match.
    Line(String),
    /// No line may match.
    Absent(String),
}

impl Pattern {
    pub fn regex(&self) -> &str {
        match self {
            Pattern::Line(re) | Pattern::Absent(re) => re,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Line(re) => write!(f, "{}", re),
            Pattern::Absent(re) => write!(f, "!({})", re),
        }
    }
}
