//! Byte comparators used by the built-in filters

use std::cmp::Ordering;
use std::fmt;

use regex::bytes::Regex;

/// How a comparator result is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
}

impl CompareOp {
    /// Apply the operator to `actual.cmp(expected)`.
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Less => ordering == Ordering::Less,
            CompareOp::LessOrEqual => ordering != Ordering::Greater,
            CompareOp::Equal => ordering == Ordering::Equal,
            CompareOp::NotEqual => ordering != Ordering::Equal,
            CompareOp::GreaterOrEqual => ordering != Ordering::Less,
            CompareOp::Greater => ordering == Ordering::Greater,
        }
    }
}

/// What bytes are compared against.
///
/// `Binary` and `BinaryPrefix` are ordered and support every `CompareOp`.
/// `Substring` and `Regex` only know match / no match: `Equal` accepts a
/// match, `NotEqual` accepts a miss, every other operator rejects.
#[derive(Clone)]
pub enum Comparator {
    /// Lexicographic comparison with the whole value
    Binary(Vec<u8>),
    /// Lexicographic comparison with the leading bytes of the value
    BinaryPrefix(Vec<u8>),
    /// Case-insensitive substring of the UTF-8 value
    Substring(String),
    /// Regex search over the raw bytes
    Regex(Regex),
}

impl Comparator {
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Comparator::Binary(bytes.into())
    }

    pub fn prefix(bytes: impl Into<Vec<u8>>) -> Self {
        Comparator::BinaryPrefix(bytes.into())
    }

    pub fn substring(needle: impl Into<String>) -> Self {
        Comparator::Substring(needle.into().to_lowercase())
    }

    /// Build a regex comparator. Fails on an invalid pattern.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Comparator::Regex(Regex::new(pattern)?))
    }

    /// True if `actual` satisfies `op` against this comparator.
    pub fn matches(&self, op: CompareOp, actual: &[u8]) -> bool {
        match self {
            Comparator::Binary(expected) => op.accepts(actual.cmp(expected.as_slice())),
            Comparator::BinaryPrefix(prefix) => {
                let head = &actual[..actual.len().min(prefix.len())];
                op.accepts(head.cmp(prefix.as_slice()))
            }
            Comparator::Substring(needle) => {
                let found = String::from_utf8_lossy(actual)
                    .to_lowercase()
                    .contains(needle.as_str());
                Self::found_matches(op, found)
            }
            Comparator::Regex(regex) => Self::found_matches(op, regex.is_match(actual)),
        }
    }

    fn found_matches(op: CompareOp, found: bool) -> bool {
        match op {
            CompareOp::Equal => found,
            CompareOp::NotEqual => !found,
            _ => false,
        }
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Binary(bytes) => {
                write!(f, "Binary({:?})", String::from_utf8_lossy(bytes))
            }
            Comparator::BinaryPrefix(bytes) => {
                write!(f, "BinaryPrefix({:?})", String::from_utf8_lossy(bytes))
            }
            Comparator::Substring(needle) => write!(f, "Substring({:?})", needle),
            Comparator::Regex(regex) => write!(f, "Regex({:?})", regex.as_str()),
        }
    }
}
