//! Source locations attached to syntax nodes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node in the original source, as reported by the parser.
///
/// Lines are 1-based, columns 0-based (the ESTree `loc.start` convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
